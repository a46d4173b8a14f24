//! Array element loads and stores.
//!
//! Every access null-checks the array, then bounds-checks the index
//! against the live length; the diagnostic names both the length and the
//! offending index. Object stores additionally check assignability against
//! the array's element class.

use crate::dex::InsnRef;
use crate::frame::Frame;
use crate::interp::fields::{load_by_kind, store_by_kind};
use crate::interp::Interpreter;
use crate::runtime::thread::ExceptionKind;
use crate::runtime::{PrimKind, Runtime};
use crate::value::Value;

impl<'a, R: Runtime> Interpreter<'a, R> {
    /// Null and bounds checks shared by every element access. Returns the
    /// validated index.
    fn check_array_access(
        &mut self,
        frame: &Frame,
        insn: InsnRef<'_>,
        is_store: bool,
    ) -> Option<i32> {
        let array = frame.get_ref(insn.b_23x());
        if array.is_null() {
            let message = if is_store {
                "attempt to write to null array"
            } else {
                "attempt to read from null array"
            };
            self.throw(ExceptionKind::NullPointer, message.into());
            return None;
        }
        let index = frame.get(insn.c_23x());
        let length = self.env.array_length(array);
        if index < 0 || index >= length {
            self.throw(
                ExceptionKind::ArrayIndexOutOfBounds,
                format!("length={}; index={}", length, index),
            );
            return None;
        }
        Some(index)
    }

    pub(crate) fn do_aget(&mut self, frame: &mut Frame, insn: InsnRef<'_>, kind: PrimKind) -> bool {
        let index = match self.check_array_access(frame, insn, false) {
            Some(i) => i,
            None => return false,
        };
        let array = frame.get_ref(insn.b_23x());
        let value = self.env.array_get(array, index);
        store_by_kind(frame, insn.a_21(), kind, value);
        true
    }

    pub(crate) fn do_aput(&mut self, frame: &Frame, insn: InsnRef<'_>, kind: PrimKind) -> bool {
        let index = match self.check_array_access(frame, insn, true) {
            Some(i) => i,
            None => return false,
        };
        let array = frame.get_ref(insn.b_23x());
        if kind == PrimKind::Object {
            let value = frame.get_ref(insn.a_21());
            if !value.is_null() {
                if let Some(element_class) = self.env.array_element_class(array) {
                    if !self.env.is_instance_of(value, element_class) {
                        let value_desc = self
                            .env
                            .class_descriptor(self.env.object_class(value))
                            .to_string();
                        let element_desc = self.env.class_descriptor(element_class).to_string();
                        self.throw(
                            ExceptionKind::ArrayStore,
                            format!(
                                "{} cannot be stored in an array of {}",
                                value_desc, element_desc
                            ),
                        );
                        return false;
                    }
                }
            }
            self.env.array_put(array, index, Value::from_ref(value));
        } else {
            let value = load_by_kind(frame, insn.a_21(), kind);
            self.env.array_put(array, index, value);
        }
        true
    }

    /// Allocates and populates an array from argument registers, leaving
    /// the new array in the result register. Only int and reference
    /// components are supported by the format; wide components are a
    /// malformed request.
    pub(crate) fn do_filled_new_array<const ACCESS_CHECK: bool>(
        &mut self,
        frame: &Frame,
        insn: InsnRef<'_>,
        range: bool,
    ) -> Option<Value> {
        let length = if range {
            insn.count_3rc() as i32
        } else {
            insn.count_35c() as i32
        };
        if length < 0 {
            self.throw(
                ExceptionKind::NegativeArraySize,
                format!("array length {}", length),
            );
            return None;
        }
        let array_class = match self.env.resolve_class(
            self.thread,
            frame.method(),
            insn.b_35c(),
            ACCESS_CHECK,
        ) {
            Some(c) => c,
            None => return None,
        };
        let component = match self.env.array_component_kind(array_class) {
            Some(k) => k,
            None => {
                let desc = self.env.class_descriptor(array_class).to_string();
                self.throw(
                    ExceptionKind::VirtualMachine,
                    format!("filled-new-array of non-array type {}", desc),
                );
                return None;
            }
        };
        match component {
            PrimKind::Int | PrimKind::Object => {}
            PrimKind::Long => {
                let desc = self.env.class_descriptor(array_class).to_string();
                self.throw(
                    ExceptionKind::VirtualMachine,
                    format!("bad filled array request for type {}", desc),
                );
                return None;
            }
            _ => {
                let desc = self.env.class_descriptor(array_class).to_string();
                self.throw(
                    ExceptionKind::VirtualMachine,
                    format!(
                        "found type {}; filled-new-array not implemented for anything but 'int'",
                        desc
                    ),
                );
                return None;
            }
        }
        let array = match self.env.alloc_array(self.thread, array_class, length) {
            Some(a) => a,
            None => return None,
        };
        let args35 = if range { [0u16; 5] } else { insn.args_35c() };
        for i in 0..length {
            let reg = if range {
                insn.c_3rc() + i as u16
            } else {
                args35[i as usize]
            };
            let value = if component == PrimKind::Int {
                Value::from_i32(frame.get(reg))
            } else {
                Value::from_ref(frame.get_ref(reg))
            };
            self.env.array_put(array, i, value);
        }
        Some(Value::from_ref(array))
    }
}
