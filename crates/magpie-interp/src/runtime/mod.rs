//! The seam between the interpreter and the rest of the VM.
//!
//! The interpreter owns frames and instruction semantics; everything else
//! (class linking, the heap and collector, monitors, the native bridge) is
//! a collaborator reached through the [`Runtime`] trait. Method and field
//! descriptors are owned by the class model; the types here are the shared
//! vocabulary both sides speak.

pub mod suspend;
pub mod thread;
pub mod trace;

use std::sync::Arc;

use crate::dex::{self, CodeItem};
use crate::value::{ObjRef, Value};

use self::thread::{ExceptionKind, ThreadContext};

/// Identifies a loaded class within the class model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Identifies a linked method within the class model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u32);

/// Identifies a linked field within the class model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub u32);

/// Method access and state flags, numbered as in the container format.
pub mod access {
    /// Declared `static`.
    pub const STATIC: u32 = 0x0008;
    /// Implemented by native code.
    pub const NATIVE: u32 = 0x0100;
    /// Has no body.
    pub const ABSTRACT: u32 = 0x0400;
    /// A prior verification pass proved per-instruction checks redundant;
    /// selects the checked-fast dispatch mode.
    pub const PREVERIFIED: u32 = 0x0008_0000;
}

/// The call kinds the invocation engine distinguishes. Each has its own
/// target-resolution rule; the quickened virtual forms are handled
/// separately since they bypass method-index resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    /// Fixed target, requires a receiver (constructors, private methods).
    Direct,
    /// Fixed target, no receiver.
    Static,
    /// Dispatch through the receiver's class table.
    Virtual,
    /// Dispatch through the caller's declaring class's parent table.
    Super,
    /// Dispatch through the receiver's interface-method mapping.
    Interface,
}

impl InvokeKind {
    /// Whether this kind carries a receiver in the first argument register.
    #[inline]
    pub fn has_receiver(self) -> bool {
        !matches!(self, InvokeKind::Static)
    }
}

/// Primitive width classes for field and array accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimKind {
    /// 8-bit 0/1 value.
    Boolean,
    /// Signed 8-bit value.
    Byte,
    /// Unsigned 16-bit value.
    Char,
    /// Signed 16-bit value.
    Short,
    /// Signed 32-bit value (also float bits).
    Int,
    /// Signed 64-bit value (also double bits), two registers wide.
    Long,
    /// An object reference.
    Object,
}

impl PrimKind {
    /// Whether values of this kind span two registers.
    #[inline]
    pub fn is_wide(self) -> bool {
        matches!(self, PrimKind::Long)
    }
}

/// A method descriptor as the class model exposes it. The interpreter holds
/// these briefly (cloned; the body is shared through an `Arc`) while a
/// frame for the method is live.
#[derive(Debug, Clone)]
pub struct Method {
    /// The class declaring this method.
    pub declaring_class: ClassId,
    /// Unqualified method name.
    pub name: String,
    /// Shorthand signature: return type first, then parameter types.
    pub shorty: String,
    /// Access and state flags (see [`access`]).
    pub access_flags: u32,
    /// Bytecode body; `None` for native and abstract methods.
    pub code: Option<Arc<CodeItem>>,
    /// Position in the declaring class's dispatch table, when virtual.
    pub vtable_index: Option<u16>,
}

impl Method {
    /// Declared `static`.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.access_flags & access::STATIC != 0
    }

    /// Implemented by native code.
    #[inline]
    pub fn is_native(&self) -> bool {
        self.access_flags & access::NATIVE != 0
    }

    /// Has no body.
    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.access_flags & access::ABSTRACT != 0
    }

    /// Eligible for the checked-fast dispatch mode.
    #[inline]
    pub fn is_preverified(&self) -> bool {
        self.access_flags & access::PREVERIFIED != 0
    }

    /// Number of argument registers, including the receiver for instance
    /// methods. Used to size frames for methods without a body.
    pub fn num_arg_registers(&self) -> u16 {
        let args = dex::num_arg_registers(&self.shorty);
        if self.is_static() {
            args
        } else {
            args + 1
        }
    }
}

/// A field descriptor as the class model exposes it.
#[derive(Debug, Clone)]
pub struct Field {
    /// The class declaring this field.
    pub declaring_class: ClassId,
    /// Unqualified field name.
    pub name: String,
    /// Width class of the field.
    pub kind: PrimKind,
    /// Declared class of an object-typed field, for store checks.
    pub class: Option<ClassId>,
    /// Declared `static`.
    pub is_static: bool,
    /// Volatile fields get acquire/release ordering at the heap seam.
    pub is_volatile: bool,
    /// Byte offset within instances, as published to quickened code.
    pub offset: u32,
}

/// Everything the interpreter asks of the surrounding VM.
///
/// Resolution methods may recurse into the interpreter (a class initializer
/// is itself interpreted code) and report failure by setting the pending
/// exception on the thread and returning `None`/`false`; the linkage-error
/// kind is the resolver's to pick. A resolver that recovers from a failed
/// fast-path lookup by retrying the fully-checked path clears the pending
/// slot before reporting success. Pure queries take `&self` and cannot
/// fail.
pub trait Runtime {
    // ---- class model ----

    /// The descriptor of a linked method.
    fn method(&self, method: MethodId) -> &Method;

    /// The descriptor of a linked field.
    fn field(&self, field: FieldId) -> &Field;

    /// The descriptor string of a class, for diagnostics and the shim.
    fn class_descriptor(&self, class: ClassId) -> &str;

    // ---- resolution ----

    /// Resolves a method by container index from `referrer`'s pool,
    /// applying visibility checks when `access_check` is set. Resolution of
    /// a static target triggers its class's initialization.
    fn resolve_method(
        &mut self,
        thread: &mut ThreadContext,
        referrer: MethodId,
        method_idx: u16,
        kind: InvokeKind,
        access_check: bool,
    ) -> Option<MethodId>;

    /// Resolves a field by container index from `referrer`'s pool. When
    /// `access_check` is set the resolver also verifies staticness,
    /// visibility, and that the field's width matches `expected`. Resolving
    /// a static field triggers its declaring class's initialization before
    /// the access proceeds.
    fn resolve_field(
        &mut self,
        thread: &mut ThreadContext,
        referrer: MethodId,
        field_idx: u16,
        is_static: bool,
        is_put: bool,
        expected: PrimKind,
        access_check: bool,
    ) -> Option<FieldId>;

    /// Resolves a type by container index from `referrer`'s pool.
    fn resolve_class(
        &mut self,
        thread: &mut ThreadContext,
        referrer: MethodId,
        type_idx: u16,
        access_check: bool,
    ) -> Option<ClassId>;

    /// A type already resolved in `referrer`'s pool, without triggering
    /// resolution. Handler matching during unwinding must not run
    /// initializers.
    fn lookup_resolved_class(&self, referrer: MethodId, type_idx: u16) -> Option<ClassId>;

    /// Resolves the class of `referrer`'s return type.
    fn resolve_return_class(
        &mut self,
        thread: &mut ThreadContext,
        referrer: MethodId,
    ) -> Option<ClassId>;

    /// Resolves a string constant, interning it. Triggers string-class
    /// initialization on first use.
    fn resolve_string(
        &mut self,
        thread: &mut ThreadContext,
        referrer: MethodId,
        string_idx: u32,
    ) -> Option<ObjRef>;

    /// Runs `class`'s initializer if it has not run yet. `false` means the
    /// initializer failed and the pending exception is set.
    fn ensure_initialized(&mut self, thread: &mut ThreadContext, class: ClassId) -> bool;

    // ---- type system ----

    /// Runtime class of a non-null object.
    fn object_class(&self, obj: ObjRef) -> ClassId;

    /// Whether `source` is assignable to `target`.
    fn is_assignable(&self, target: ClassId, source: ClassId) -> bool;

    /// Whether a non-null object is an instance of `class`.
    fn is_instance_of(&self, obj: ObjRef, class: ClassId) -> bool {
        self.is_assignable(class, self.object_class(obj))
    }

    /// The root throwable class.
    fn throwable_class(&self) -> ClassId;

    /// The class raised for a given interpreter-detected failure.
    fn exception_class(&self, kind: ExceptionKind) -> ClassId;

    /// The detail message of a throwable object, when it has one.
    fn throwable_message(&self, obj: ObjRef) -> Option<String>;

    // ---- dispatch tables ----

    /// Entry `index` of `class`'s dispatch table.
    fn vtable_entry(&self, class: ClassId, index: u16) -> Option<MethodId>;

    /// The method `receiver_class` provides for an interface method.
    fn interface_target(&self, receiver_class: ClassId, method: MethodId) -> Option<MethodId>;

    /// Direct superclass, if any.
    fn super_class(&self, class: ClassId) -> Option<ClassId>;

    // ---- heap ----

    /// Allocates an instance of `class`; `None` on exhaustion, with the
    /// pending exception set.
    fn alloc_object(&mut self, thread: &mut ThreadContext, class: ClassId) -> Option<ObjRef>;

    /// Allocates an instance of `array_class` with `length` elements;
    /// fails with a negative-size or out-of-memory exception, reported via
    /// the pending slot.
    fn alloc_array(
        &mut self,
        thread: &mut ThreadContext,
        array_class: ClassId,
        length: i32,
    ) -> Option<ObjRef>;

    /// Builds a throwable of `class` with `message`. Infallible: the
    /// allocator keeps a reserve for exception objects.
    fn alloc_throwable(
        &mut self,
        thread: &mut ThreadContext,
        class: ClassId,
        message: &str,
    ) -> ObjRef;

    /// Length of a non-null array.
    fn array_length(&self, array: ObjRef) -> i32;

    /// Element class of a non-null object array; `None` for primitive
    /// arrays.
    fn array_element_class(&self, array: ObjRef) -> Option<ClassId>;

    /// Element width class of a non-null array object.
    fn array_element_kind(&self, array: ObjRef) -> PrimKind;

    /// Component width class of an array class; `None` when `class` is not
    /// an array class.
    fn array_component_kind(&self, class: ClassId) -> Option<PrimKind>;

    /// Reads an element. Null and bounds checks have already happened.
    fn array_get(&self, array: ObjRef, index: i32) -> Value;

    /// Writes an element. Null, bounds, and store checks have already
    /// happened; narrow values arrive truncated to their canonical form.
    fn array_put(&mut self, array: ObjRef, index: i32, value: Value);

    /// Reads a static field. The declaring class is initialized.
    fn get_static(&self, field: FieldId) -> Value;

    /// Writes a static field.
    fn set_static(&mut self, field: FieldId, value: Value);

    /// Reads an instance field of a non-null object. Volatile fields
    /// observe acquire ordering.
    fn get_instance(&self, obj: ObjRef, field: FieldId) -> Value;

    /// Writes an instance field of a non-null object. Volatile fields
    /// observe release ordering.
    fn set_instance(&mut self, obj: ObjRef, field: FieldId, value: Value);

    /// Quick-path read at a pre-resolved byte offset; non-volatile instance
    /// fields only.
    fn get_instance_at(&self, obj: ObjRef, offset: u32, kind: PrimKind) -> Value;

    /// Quick-path write at a pre-resolved byte offset.
    fn set_instance_at(&mut self, obj: ObjRef, offset: u32, kind: PrimKind, value: Value);

    // ---- mirrors, strings, monitors, natives ----

    /// The managed mirror object of a class.
    fn class_mirror(&mut self, class: ClassId) -> ObjRef;

    /// Looks up a class by descriptor (bootstrap shim use).
    fn find_class(&mut self, thread: &mut ThreadContext, descriptor: &str) -> Option<ClassId>;

    /// Interns a managed string, returning the canonical instance.
    fn intern_string(&mut self, thread: &mut ThreadContext, s: ObjRef) -> ObjRef;

    /// The text of a managed string object.
    fn string_text(&self, s: ObjRef) -> Option<String>;

    /// Blocking lock acquire on a non-null object's monitor. `false` means
    /// a pending exception was set instead.
    fn monitor_enter(&mut self, thread: &mut ThreadContext, obj: ObjRef) -> bool;

    /// Lock release on a non-null object's monitor.
    fn monitor_exit(&mut self, thread: &mut ThreadContext, obj: ObjRef) -> bool;

    /// Calls a native method through the bridge; only used once the
    /// managed library has started. Arguments are packed as at the
    /// invocation entry point.
    fn call_native(
        &mut self,
        thread: &mut ThreadContext,
        method: MethodId,
        receiver: ObjRef,
        args: &[u32],
    ) -> Option<Value>;

    /// Whether the managed class library has been started. Until it has,
    /// native calls are routed to the bootstrap shim.
    fn is_started(&self) -> bool;
}
