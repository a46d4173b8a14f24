//! The interpreter proper: entry points, the dispatch loop, and the
//! protocol pieces it leans on (invocation, field/array access, unwinding,
//! the bootstrap shim).
//!
//! External callers reach interpreted execution through three doors:
//! [`enter_from_invoke`] (native bridge and reflection, packed arguments),
//! [`enter_from_bridge`] (compiled code calling down with a pre-built
//! frame), and [`enter_from_deoptimize`] (replaying a chain of suspended
//! frames). Each drives the same dispatch loop; invocation instructions
//! recurse into it synchronously.

pub mod arith;

mod arrays;
mod dispatch;
mod fields;
mod invoke;
mod unstarted;
mod unwind;

pub use unstarted::is_intercepted;
pub use unwind::UnwindStatus;

use std::sync::Arc;

use crate::dex::CodeItem;
use crate::frame::Frame;
use crate::runtime::thread::{ExceptionKind, PendingException, ThreadContext};
use crate::runtime::{MethodId, Runtime};
use crate::value::{ObjRef, Value};

/// How a frame's execution ended.
#[derive(Debug)]
pub(crate) enum ExecResult {
    /// A return instruction ran; the tagged result is for the caller's
    /// result register.
    Return(Value),
    /// No handler matched a thrown exception; the frame was abandoned and
    /// the pending exception is still set for the caller to observe.
    Unwound,
}

/// One interpreted call chain's view of the world: the runtime seam plus
/// the thread state, borrowed for the duration of the outermost call.
pub(crate) struct Interpreter<'a, R: Runtime> {
    pub(crate) env: &'a mut R,
    pub(crate) thread: &'a mut ThreadContext,
}

impl<'a, R: Runtime> Interpreter<'a, R> {
    pub(crate) fn new(env: &'a mut R, thread: &'a mut ThreadContext) -> Self {
        Interpreter { env, thread }
    }

    /// Runs `frame` to completion, selecting the dispatch mode once from
    /// the method's preverified flag.
    pub(crate) fn execute(
        &mut self,
        frame: &mut Frame,
        code: &CodeItem,
        result_register: Value,
    ) -> ExecResult {
        if self.env.method(frame.method()).is_preverified() {
            self.execute_impl::<false>(frame, code, result_register)
        } else {
            self.execute_impl::<true>(frame, code, result_register)
        }
    }

    /// Raises an interpreter-detected failure as a managed exception.
    pub(crate) fn throw(&mut self, kind: ExceptionKind, message: String) {
        let class = self.env.exception_class(kind);
        let object = self.env.alloc_throwable(self.thread, class, &message);
        let descriptor = self.env.class_descriptor(class).to_string();
        self.thread.set_pending(PendingException {
            class,
            object,
            message: Some(message),
            descriptor,
        });
    }

    /// Puts an already-built throwable object in flight.
    pub(crate) fn throw_object(&mut self, object: ObjRef) {
        let class = self.env.object_class(object);
        let message = self.env.throwable_message(object);
        let descriptor = self.env.class_descriptor(class).to_string();
        self.thread.set_pending(PendingException {
            class,
            object,
            message,
            descriptor,
        });
    }

    fn invoke_entry(&mut self, method_id: MethodId, receiver: ObjRef, args: &[u32]) -> Option<Value> {
        if !self.thread.enter_frame() {
            let name = self.env.method(method_id).name.clone();
            self.throw(
                ExceptionKind::StackOverflow,
                format!("call depth exhausted entering {}", name),
            );
            return None;
        }
        let out = self.invoke_entry_inner(method_id, receiver, args);
        self.thread.leave_frame();
        out
    }

    fn invoke_entry_inner(
        &mut self,
        method_id: MethodId,
        receiver: ObjRef,
        args: &[u32],
    ) -> Option<Value> {
        let method = self.env.method(method_id).clone();
        if method.is_abstract() {
            self.throw(
                ExceptionKind::AbstractMethod,
                format!("abstract method \"{}\"", method.name),
            );
            return None;
        }
        let (num_regs, num_ins) = match &method.code {
            Some(code) => (code.registers_size, code.ins_size),
            None => {
                let n = method.num_arg_registers();
                (n, n)
            }
        };

        let mut frame = Frame::new(method_id, num_regs, num_ins);
        let mut cur_reg = num_regs - num_ins;
        if !method.is_static() {
            debug_assert!(!receiver.is_null(), "instance entry without a receiver");
            frame.set_ref(cur_reg, receiver);
            cur_reg += 1;
        } else if !self.env.ensure_initialized(self.thread, method.declaring_class) {
            return None;
        }

        let shorty = method.shorty.as_bytes();
        let mut shorty_pos = 1usize;
        let mut arg_pos = 0usize;
        while cur_reg < num_regs {
            match shorty[shorty_pos] {
                b'L' => frame.set_ref(cur_reg, ObjRef::from_raw(args[arg_pos])),
                b'J' | b'D' => {
                    let wide = (args[arg_pos + 1] as u64) << 32 | args[arg_pos] as u64;
                    frame.set_wide(cur_reg, wide as i64);
                    cur_reg += 1;
                    arg_pos += 1;
                }
                _ => frame.set(cur_reg, args[arg_pos] as i32),
            }
            shorty_pos += 1;
            arg_pos += 1;
            cur_reg += 1;
        }

        if !method.is_native() {
            let code = match &method.code {
                Some(code) => Arc::clone(code),
                None => {
                    self.throw(
                        ExceptionKind::VirtualMachine,
                        format!("method {} has no body", method.name),
                    );
                    return None;
                }
            };
            match self.execute(&mut frame, &code, Value::default()) {
                ExecResult::Return(v) => Some(v),
                ExecResult::Unwound => None,
            }
        } else if self.env.is_started() {
            self.env.call_native(self.thread, method_id, receiver, args)
        } else {
            self.intercept_native(method_id, receiver, args)
        }
    }

    fn deopt_entry(&mut self, chain: Box<Frame>, last_result: Value) -> Option<Value> {
        let mut value = last_result;
        let mut next = Some(chain);
        while let Some(mut frame) = next {
            next = frame.take_link();
            let method = self.env.method(frame.method()).clone();
            let code = match &method.code {
                Some(code) => Arc::clone(code),
                None => {
                    self.throw(
                        ExceptionKind::VirtualMachine,
                        format!("deoptimized method {} has no body", method.name),
                    );
                    return None;
                }
            };
            value = match self.execute(&mut frame, &code, value) {
                ExecResult::Return(v) => v,
                ExecResult::Unwound => Value::default(),
            };
        }
        Some(value)
    }

    fn bridge_entry(&mut self, frame: &mut Frame) -> Option<Value> {
        if !self.thread.enter_frame() {
            let name = self.env.method(frame.method()).name.clone();
            self.throw(
                ExceptionKind::StackOverflow,
                format!("call depth exhausted entering {}", name),
            );
            return None;
        }
        let out = self.bridge_entry_inner(frame);
        self.thread.leave_frame();
        out
    }

    fn bridge_entry_inner(&mut self, frame: &mut Frame) -> Option<Value> {
        let method = self.env.method(frame.method()).clone();
        if method.is_static() && !self.env.ensure_initialized(self.thread, method.declaring_class) {
            return None;
        }
        if !method.is_native() {
            let code = match &method.code {
                Some(code) => Arc::clone(code),
                None => {
                    self.throw(
                        ExceptionKind::VirtualMachine,
                        format!("method {} has no body", method.name),
                    );
                    return None;
                }
            };
            match self.execute(frame, &code, Value::default()) {
                ExecResult::Return(v) => Some(v),
                ExecResult::Unwound => None,
            }
        } else {
            // Compiled code only lands native calls here before the library
            // has started; afterwards the bridge dispatches them directly.
            let base = frame.ins_base();
            let (receiver, first_arg) = if method.is_static() {
                (ObjRef::NULL, base)
            } else {
                (frame.get_ref(base), base + 1)
            };
            let args: Vec<u32> = (first_arg..frame.num_regs())
                .map(|r| frame.get(r) as u32)
                .collect();
            self.intercept_native(frame.method(), receiver, &args)
        }
    }
}

fn take_unhandled(thread: &mut ThreadContext) -> PendingException {
    thread.take_pending().unwrap_or_else(|| PendingException {
        class: crate::runtime::ClassId(u32::MAX),
        object: ObjRef::NULL,
        message: Some("frame unwound without a pending exception".into()),
        descriptor: "Ljava/lang/VirtualMachineError;".into(),
    })
}

/// Interprets `method` with packed arguments, as the native bridge and
/// reflective invocation do.
///
/// `args` holds one `u32` per argument register in shorty order: raw handle
/// bits for references, value bits for narrow primitives, and low/high
/// pairs for wide primitives. The receiver is passed separately and must be
/// non-null for instance methods.
pub fn enter_from_invoke<R: Runtime>(
    env: &mut R,
    thread: &mut ThreadContext,
    method: MethodId,
    receiver: ObjRef,
    args: &[u32],
) -> Result<Value, PendingException> {
    let outcome = Interpreter::new(env, thread).invoke_entry(method, receiver, args);
    match outcome {
        Some(v) => Ok(v),
        None => Err(take_unhandled(thread)),
    }
}

/// Interprets a frame pre-built by a compiled-code caller.
pub fn enter_from_bridge<R: Runtime>(
    env: &mut R,
    thread: &mut ThreadContext,
    frame: &mut Frame,
) -> Result<Value, PendingException> {
    let outcome = Interpreter::new(env, thread).bridge_entry(frame);
    match outcome {
        Some(v) => Ok(v),
        None => Err(take_unhandled(thread)),
    }
}

/// Replays a chain of frames suspended by the deoptimizer.
///
/// The chain is consumed innermost-first; each frame resumes at its saved
/// position with the previous frame's result seeding its result register,
/// `last_result` seeding the first. The deoptimizer only hands over chains
/// suspended at well-defined resume points, so replay never starts with an
/// exception in flight.
pub fn enter_from_deoptimize<R: Runtime>(
    env: &mut R,
    thread: &mut ThreadContext,
    chain: Box<Frame>,
    last_result: Value,
) -> Result<Value, PendingException> {
    let outcome = Interpreter::new(env, thread).deopt_entry(chain, last_result);
    match outcome {
        Some(value) if !thread.has_pending() => Ok(value),
        _ => Err(take_unhandled(thread)),
    }
}
