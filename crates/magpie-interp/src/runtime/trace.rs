//! Observability hooks fired by the dispatch loop and the unwinder.
//!
//! All hooks default to no-ops. Position events are the hot ones, so they
//! are gated by [`Tracer::wants_position_events`] the way the dispatch loop
//! checks for listeners before paying for the call.

use crate::runtime::thread::PendingException;
use crate::runtime::MethodId;
use crate::value::Value;

/// Event sink for interpreter observability.
pub trait Tracer {
    /// A method body is being entered at position 0.
    fn method_entered(&mut self, method: MethodId) {
        let _ = method;
    }

    /// A method returned normally with `result`.
    fn method_exited(&mut self, method: MethodId, dex_pc: u32, result: &Value) {
        let _ = (method, dex_pc, result);
    }

    /// The current position moved. Only fired when
    /// [`wants_position_events`](Tracer::wants_position_events) is true.
    fn position_moved(&mut self, method: MethodId, dex_pc: u32) {
        let _ = (method, dex_pc);
    }

    /// A handler matched; control is transferring to `handler_pc`.
    fn exception_caught(&mut self, method: MethodId, handler_pc: u32, exception: &PendingException) {
        let _ = (method, handler_pc, exception);
    }

    /// No handler matched; the frame is being abandoned.
    fn method_unwound(&mut self, method: MethodId, dex_pc: u32) {
        let _ = (method, dex_pc);
    }

    /// Whether to fire position events. Checked once per instruction.
    fn wants_position_events(&self) -> bool {
        false
    }
}

/// The default sink: everything is dropped.
pub struct NopTracer;

impl Tracer for NopTracer {}
