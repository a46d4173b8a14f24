//! Exception unwinding within one frame.
//!
//! A failing operation sets the thread's pending exception and signals the
//! dispatch loop, which asks [`Interpreter::find_handler`] where to go.
//! The walk is a small state machine: Running → Unwinding on the failure
//! signal, then either HandlerFound (jump to the handler position) or
//! FrameExhausted (abandon the frame, leave the exception in flight for
//! the caller's own unwind one level up).

use crate::dex::{CodeItem, InsnRef, Opcode};
use crate::frame::Frame;
use crate::interp::Interpreter;
use crate::runtime::Runtime;

/// Where the unwinder sent control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwindStatus {
    /// A handler matched; execution continues at `pc`, where a
    /// move-exception instruction is expected to consume the pending
    /// exception.
    HandlerFound {
        /// Position of the handler's first instruction.
        pc: u32,
    },
    /// No handler in this frame; the pending exception stays set and the
    /// frame is abandoned.
    FrameExhausted,
}

impl<'a, R: Runtime> Interpreter<'a, R> {
    /// Maps the pending exception and current position to the next
    /// position, or reports that this frame has no matching handler.
    ///
    /// Handlers are tested in table order; a catch-all always matches, a
    /// typed entry matches when its class is assignable from the
    /// exception's runtime class. Catch types are looked up from the
    /// referrer's already-resolved pool, so unwinding never triggers
    /// resolution; an unresolved catch type is skipped with a warning
    /// since verification resolves exception classes up front.
    pub(crate) fn find_handler(
        &mut self,
        frame: &Frame,
        code: &CodeItem,
        dex_pc: u32,
    ) -> UnwindStatus {
        let exception = match self.thread.pending() {
            Some(e) => e.clone(),
            None => {
                log::error!("unwinding with no pending exception at pc {:#x}", dex_pc);
                return UnwindStatus::FrameExhausted;
            }
        };

        let mut found: Option<u32> = None;
        if let Some(handlers) = code.handlers_at(dex_pc) {
            for handler in handlers {
                match handler.type_idx {
                    None => {
                        found = Some(handler.address);
                        break;
                    }
                    Some(type_idx) => {
                        match self.env.lookup_resolved_class(frame.method(), type_idx) {
                            None => {
                                log::warn!(
                                    "unresolved exception class (type index {}) while finding \
                                     catch block",
                                    type_idx
                                );
                            }
                            Some(catch_class) => {
                                if self.env.is_assignable(catch_class, exception.class) {
                                    found = Some(handler.address);
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }

        match found {
            Some(handler_pc) => {
                self.thread
                    .tracer_mut()
                    .exception_caught(frame.method(), handler_pc, &exception);
                // The handler's leading move-exception consumes the pending
                // exception; a handler without one re-raises nothing, so the
                // slot is cleared here instead.
                let first = InsnRef::at(&code.insns, handler_pc);
                if first.opcode() != Some(Opcode::MoveException) {
                    self.thread.clear_pending();
                }
                UnwindStatus::HandlerFound { pc: handler_pc }
            }
            None => {
                self.thread
                    .tracer_mut()
                    .method_unwound(frame.method(), dex_pc);
                UnwindStatus::FrameExhausted
            }
        }
    }
}
