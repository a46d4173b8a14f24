//! The bootstrap shim: hand-written stand-ins for the few library natives
//! that must work before the managed class library has started.
//!
//! During early bootstrap the library's own native registrations have not
//! run yet, so native calls cannot go through the bridge. A fixed
//! allow-list of methods is emulated here instead; anything else is a
//! bootstrap-ordering bug in the surrounding system and aborts, since no
//! managed code could meaningfully handle it.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use crate::interp::Interpreter;
use crate::runtime::{MethodId, Runtime};
use crate::value::{ObjRef, Value};

/// The allow-list, keyed by declaring-class descriptor and method name.
static SHIM_METHODS: Lazy<FxHashSet<(&'static str, &'static str)>> = Lazy::new(|| {
    [
        ("Ljava/lang/Class;", "forName"),
        ("Ljava/lang/System;", "arraycopy"),
        ("Ljava/lang/Math;", "log"),
        ("Ljava/lang/Math;", "exp"),
        ("Ljava/lang/Float;", "floatToRawIntBits"),
        ("Ljava/lang/Float;", "intBitsToFloat"),
        ("Ljava/lang/String;", "intern"),
        ("Ljava/nio/ByteOrder;", "isLittleEndian"),
    ]
    .into_iter()
    .collect()
});

/// Whether the shim emulates a given method identity.
pub fn is_intercepted(class_descriptor: &str, name: &str) -> bool {
    SHIM_METHODS.contains(&(class_descriptor, name))
}

/// Converts a dotted class name to a descriptor. Array names are already
/// descriptors and pass through.
fn dot_to_descriptor(name: &str) -> String {
    if name.starts_with('[') {
        name.replace('.', "/")
    } else {
        format!("L{};", name.replace('.', "/"))
    }
}

fn wide_arg(args: &[u32], at: usize) -> u64 {
    (args[at + 1] as u64) << 32 | args[at] as u64
}

impl<'a, R: Runtime> Interpreter<'a, R> {
    /// Emulates a native call while the library is unstarted. Panics on a
    /// method outside the allow-list: that is a configuration error, not a
    /// managed failure.
    pub(crate) fn intercept_native(
        &mut self,
        method: MethodId,
        receiver: ObjRef,
        args: &[u32],
    ) -> Option<Value> {
        let (descriptor, name) = {
            let m = self.env.method(method);
            (
                self.env.class_descriptor(m.declaring_class).to_string(),
                m.name.clone(),
            )
        };
        match (descriptor.as_str(), name.as_str()) {
            ("Ljava/lang/Class;", "forName") => {
                let requested = self
                    .env
                    .string_text(ObjRef::from_raw(args[0]))
                    .unwrap_or_default();
                let descriptor = dot_to_descriptor(&requested);
                match self.env.find_class(self.thread, &descriptor) {
                    Some(class) => Some(Value::from_ref(self.env.class_mirror(class))),
                    None => panic!(
                        "Class.forName failed in unstarted runtime for class {}",
                        descriptor
                    ),
                }
            }
            ("Ljava/lang/System;", "arraycopy") => {
                let src = ObjRef::from_raw(args[0]);
                let src_pos = args[1] as i32;
                let dst = ObjRef::from_raw(args[2]);
                let dst_pos = args[3] as i32;
                let length = args[4] as i32;
                for i in 0..length {
                    let v = self.env.array_get(src, src_pos + i);
                    self.env.array_put(dst, dst_pos + i, v);
                }
                Some(Value::default())
            }
            ("Ljava/lang/Math;", "log") => {
                Some(Value::from_f64(f64::from_bits(wide_arg(args, 0)).ln()))
            }
            ("Ljava/lang/Math;", "exp") => {
                Some(Value::from_f64(f64::from_bits(wide_arg(args, 0)).exp()))
            }
            ("Ljava/lang/Float;", "floatToRawIntBits") => Some(Value::from_i32(args[0] as i32)),
            ("Ljava/lang/Float;", "intBitsToFloat") => Some(Value::from_i32(args[0] as i32)),
            ("Ljava/lang/String;", "intern") => {
                let interned = self.env.intern_string(self.thread, receiver);
                Some(Value::from_ref(interned))
            }
            ("Ljava/nio/ByteOrder;", "isLittleEndian") => {
                Some(Value::from_i32(cfg!(target_endian = "little") as i32))
            }
            _ => panic!(
                "attempt to invoke native method in unstarted runtime: {} {}",
                descriptor, name
            ),
        }
    }
}
