//! Per-thread interpreter state: the pending-exception slot, the suspend
//! point, the recursion budget, and the observability hooks.

use std::sync::Arc;

use crate::runtime::suspend::SuspendController;
use crate::runtime::trace::{NopTracer, Tracer};
use crate::runtime::ClassId;
use crate::value::ObjRef;

/// Default interpreted-call depth budget. Recursion reuses the native call
/// stack, so the guard trips well before the native guard page would.
pub const DEFAULT_MAX_INTERP_DEPTH: usize = 256;

/// The failures the interpreter itself detects, mapped to managed
/// exception classes by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExceptionKind {
    /// A referenced class could not be resolved.
    #[error("no class definition found")]
    NoClassDefFound,
    /// A referenced method could not be resolved.
    #[error("no such method")]
    NoSuchMethod,
    /// A referenced field could not be resolved.
    #[error("no such field")]
    NoSuchField,
    /// A resolved member no longer matches the call site's expectations.
    #[error("incompatible class change")]
    IncompatibleClassChange,
    /// Dispatch landed on a method with no body.
    #[error("abstract method invoked")]
    AbstractMethod,
    /// A null receiver, array, or field target.
    #[error("null pointer")]
    NullPointer,
    /// Integer division or remainder by zero.
    #[error("arithmetic error")]
    Arithmetic,
    /// An array index outside `0..length`.
    #[error("array index out of bounds")]
    ArrayIndexOutOfBounds,
    /// An array allocation with a negative length.
    #[error("negative array size")]
    NegativeArraySize,
    /// A failed cast.
    #[error("class cast error")]
    ClassCast,
    /// A store of an incompatible element into an object array.
    #[error("array store error")]
    ArrayStore,
    /// An internal invariant the verifier should have ruled out; a defect
    /// signal, not input-dependent behavior.
    #[error("virtual machine error")]
    VirtualMachine,
    /// The interpreted-call depth guard tripped.
    #[error("stack overflow")]
    StackOverflow,
    /// The allocator is exhausted.
    #[error("out of memory")]
    OutOfMemory,
    /// A monitor operation on a monitor the thread does not own.
    #[error("illegal monitor state")]
    IllegalMonitorState,
}

/// A thrown, not-yet-caught exception: the runtime type that handler
/// matching tests, the throwable object itself, and the detail message.
#[derive(Debug, Clone)]
pub struct PendingException {
    /// Runtime class of the thrown object.
    pub class: ClassId,
    /// The thrown object; what move-exception loads.
    pub object: ObjRef,
    /// Detail message, when one exists.
    pub message: Option<String>,
    /// Descriptor of `class`, captured at throw time for diagnostics.
    pub descriptor: String,
}

impl std::fmt::Display for PendingException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.descriptor, message),
            None => write!(f, "{}", self.descriptor),
        }
    }
}

impl std::error::Error for PendingException {}

/// Thread-scoped interpreter state, passed by reference through every
/// component.
///
/// The pending-exception slot is the single fault channel: failing
/// operations set it and signal the dispatcher, which hands off to the
/// unwinder. Component boundaries surface it as a `Result` instead of
/// letting callers poke at the slot.
pub struct ThreadContext {
    pending: Option<PendingException>,
    suspend: Arc<SuspendController>,
    frames_remaining: usize,
    max_depth: usize,
    tracer: Box<dyn Tracer>,
}

impl ThreadContext {
    /// A context with the default depth budget and no tracer, sharing
    /// `suspend` with whoever pauses this thread.
    pub fn new(suspend: Arc<SuspendController>) -> Self {
        ThreadContext {
            pending: None,
            suspend,
            frames_remaining: DEFAULT_MAX_INTERP_DEPTH,
            max_depth: DEFAULT_MAX_INTERP_DEPTH,
            tracer: Box::new(NopTracer),
        }
    }

    /// Replaces the depth budget.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.frames_remaining = depth;
        self.max_depth = depth;
        self
    }

    /// Installs an observability sink.
    pub fn with_tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// The installed tracer.
    #[inline]
    pub fn tracer(&self) -> &dyn Tracer {
        self.tracer.as_ref()
    }

    /// The installed tracer, mutably.
    #[inline]
    pub fn tracer_mut(&mut self) -> &mut dyn Tracer {
        self.tracer.as_mut()
    }

    /// The suspend point polled at the top of each dispatch iteration.
    #[inline]
    pub fn suspend(&self) -> &SuspendController {
        &self.suspend
    }

    /// The pending exception, if one is in flight.
    #[inline]
    pub fn pending(&self) -> Option<&PendingException> {
        self.pending.as_ref()
    }

    /// Whether an exception is in flight.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Sets the pending exception. Any exception already in flight is
    /// replaced; the unwinder only ever sees the most recent failure.
    pub fn set_pending(&mut self, exception: PendingException) {
        self.pending = Some(exception);
    }

    /// Takes the pending exception, clearing the slot.
    pub fn take_pending(&mut self) -> Option<PendingException> {
        self.pending.take()
    }

    /// Clears the slot (handler matched, or a helper recovered locally).
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Claims headroom for one more interpreted frame. Returns `false`
    /// when the budget is exhausted; the caller must then fail the
    /// invocation *before* constructing the callee frame.
    #[inline]
    pub fn enter_frame(&mut self) -> bool {
        if self.frames_remaining == 0 {
            return false;
        }
        self.frames_remaining -= 1;
        true
    }

    /// Returns the headroom claimed by a matching [`enter_frame`].
    ///
    /// [`enter_frame`]: ThreadContext::enter_frame
    #[inline]
    pub fn leave_frame(&mut self) {
        debug_assert!(self.frames_remaining < self.max_depth);
        self.frames_remaining += 1;
    }

    /// Remaining interpreted-frame headroom.
    #[inline]
    pub fn frames_remaining(&self) -> usize {
        self.frames_remaining
    }
}
