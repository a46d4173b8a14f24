//! Slot and value representation for the interpreter.
//!
//! Registers are untyped 32-bit storage units; wide (64-bit) values span two
//! consecutive slots with the low half in the lower-numbered slot. Each slot
//! carries its own reference view so the collector can tell live references
//! apart from primitive bits without a side table.

/// A nullable handle to a managed heap object.
///
/// The interpreter never dereferences an `ObjRef` itself; the runtime seam
/// owns the heap and interprets handles. Handle `0` is the null reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(u32);

impl ObjRef {
    /// The null reference.
    pub const NULL: ObjRef = ObjRef(0);

    /// Builds a reference from its raw handle bits. `0` yields null.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ObjRef(raw)
    }

    /// Raw handle bits (`0` for null).
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True for the null reference.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for ObjRef {
    fn default() -> Self {
        ObjRef::NULL
    }
}

/// One 32-bit register slot: either primitive bits or an object reference.
///
/// Storing primitive bits replaces any reference previously held by the
/// slot, which is what makes the constant-zero aliasing rule hold: after a
/// literal `0` is written, the reference view of the slot reads as null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Raw primitive bits (one half of a wide value, or a narrow value).
    Bits(u32),
    /// An object reference, possibly null.
    Ref(ObjRef),
}

impl Slot {
    /// The raw 32-bit view of the slot. For a reference slot this is the
    /// handle's bits, so `if-eqz` style null tests work on references.
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            Slot::Bits(b) => b,
            Slot::Ref(r) => r.raw(),
        }
    }

    /// The reference view of the slot. A slot holding primitive bits reads
    /// as null, whatever the bits are.
    #[inline]
    pub fn reference(self) -> ObjRef {
        match self {
            Slot::Bits(_) => ObjRef::NULL,
            Slot::Ref(r) => r,
        }
    }
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Bits(0)
    }
}

/// A tagged scratch value: the result register, argument values at the
/// entry points, and field/array element values at the runtime seam.
///
/// `Bits` carries up to 64 bits of primitive payload; narrow values live in
/// the low 32 bits. `Ref` carries an object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Primitive payload; narrow types occupy the low 32 bits.
    Bits(u64),
    /// An object reference, possibly null.
    Ref(ObjRef),
}

impl Value {
    /// Builds an integer value.
    #[inline]
    pub fn from_i32(v: i32) -> Self {
        Value::Bits(v as u32 as u64)
    }

    /// Builds a long value.
    #[inline]
    pub fn from_i64(v: i64) -> Self {
        Value::Bits(v as u64)
    }

    /// Builds a float value from its bit pattern.
    #[inline]
    pub fn from_f32(v: f32) -> Self {
        Value::Bits(v.to_bits() as u64)
    }

    /// Builds a double value from its bit pattern.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        Value::Bits(v.to_bits())
    }

    /// Builds a reference value.
    #[inline]
    pub fn from_ref(r: ObjRef) -> Self {
        Value::Ref(r)
    }

    /// The low 32 bits as a signed integer; a reference reads as its raw
    /// handle bits.
    #[inline]
    pub fn as_i32(self) -> i32 {
        match self {
            Value::Bits(b) => b as u32 as i32,
            Value::Ref(r) => r.raw() as i32,
        }
    }

    /// The full payload as a signed long.
    #[inline]
    pub fn as_i64(self) -> i64 {
        match self {
            Value::Bits(b) => b as i64,
            Value::Ref(r) => r.raw() as i64,
        }
    }

    /// The low 32 bits reinterpreted as a float.
    #[inline]
    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.as_i32() as u32)
    }

    /// The payload reinterpreted as a double.
    #[inline]
    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.as_i64() as u64)
    }

    /// The reference view; primitive payloads read as null.
    #[inline]
    pub fn as_ref(self) -> ObjRef {
        match self {
            Value::Bits(_) => ObjRef::NULL,
            Value::Ref(r) => r,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Bits(0)
    }
}
