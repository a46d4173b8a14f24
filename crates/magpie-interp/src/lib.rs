//! Magpie VM interpreter core
//!
//! This crate is the interpreted execution engine of the Magpie VM: given a
//! method's bytecode body it emulates every instruction with the semantics
//! compiled code would produce, so interpreted and compiled execution are
//! observationally identical. It runs methods that have no machine-code
//! translation, carries early bootstrap before the managed library starts,
//! and replays suspended frames after a deoptimization.
//!
//! The crate provides:
//! - Register frames with per-slot reference views for root scanning
//! - The instruction dispatch loop (checked and checked-fast modes)
//! - The invocation and exception-unwinding protocols
//! - The bootstrap shim for pre-library native calls
//!
//! Class linking, the heap and collector, monitors, and the native bridge
//! are collaborators behind the [`Runtime`] trait; the interpreter never
//! owns them.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod dex;
pub mod frame;
pub mod interp;
pub mod runtime;
pub mod value;

pub use frame::Frame;
pub use interp::{
    enter_from_bridge, enter_from_deoptimize, enter_from_invoke, is_intercepted, UnwindStatus,
};
pub use runtime::suspend::SuspendController;
pub use runtime::thread::{ExceptionKind, PendingException, ThreadContext};
pub use runtime::trace::{NopTracer, Tracer};
pub use runtime::{
    access, ClassId, Field, FieldId, InvokeKind, Method, MethodId, PrimKind, Runtime,
};
pub use value::{ObjRef, Slot, Value};
