//! Field loads and stores: the resolving slow path and the quickened
//! offset path.
//!
//! The slow path resolves the field index through the runtime (which also
//! runs the declaring class's initializer for statics and applies
//! access/staticness/width checks in access-checked mode). The quick path
//! trusts a byte offset a prior optimization pass baked into the
//! instruction; it only exists for non-volatile instance fields and skips
//! every check except the null test.

use crate::dex::InsnRef;
use crate::frame::Frame;
use crate::interp::Interpreter;
use crate::runtime::thread::ExceptionKind;
use crate::runtime::{PrimKind, Runtime};
use crate::value::Value;

/// Writes a field/element value into a register of the right width.
pub(crate) fn store_by_kind(frame: &mut Frame, reg: u16, kind: PrimKind, value: Value) {
    match kind {
        PrimKind::Long => frame.set_wide(reg, value.as_i64()),
        PrimKind::Object => frame.set_ref(reg, value.as_ref()),
        _ => frame.set(reg, value.as_i32()),
    }
}

/// Reads a register as a field/element value, truncating narrow kinds to
/// their canonical form the way the typed heap cells would.
pub(crate) fn load_by_kind(frame: &Frame, reg: u16, kind: PrimKind) -> Value {
    match kind {
        PrimKind::Boolean => Value::from_i32(frame.get(reg) as u8 as i32),
        PrimKind::Byte => Value::from_i32(frame.get(reg) as i8 as i32),
        PrimKind::Char => Value::from_i32(frame.get(reg) as u16 as i32),
        PrimKind::Short => Value::from_i32(frame.get(reg) as i16 as i32),
        PrimKind::Int => Value::from_i32(frame.get(reg)),
        PrimKind::Long => Value::from_i64(frame.get_wide(reg)),
        PrimKind::Object => Value::from_ref(frame.get_ref(reg)),
    }
}

impl<'a, R: Runtime> Interpreter<'a, R> {
    pub(crate) fn do_field_get<const ACCESS_CHECK: bool>(
        &mut self,
        frame: &mut Frame,
        insn: InsnRef<'_>,
        is_static: bool,
        kind: PrimKind,
    ) -> bool {
        let field_idx = if is_static { insn.b_21c() } else { insn.c_22c() };
        let field_id = match self.env.resolve_field(
            self.thread,
            frame.method(),
            field_idx,
            is_static,
            false,
            kind,
            ACCESS_CHECK,
        ) {
            Some(f) => f,
            None => return false,
        };
        let value = if is_static {
            self.env.get_static(field_id)
        } else {
            let obj = frame.get_ref(insn.b_12x());
            if obj.is_null() {
                let name = self.env.field(field_id).name.clone();
                self.throw(
                    ExceptionKind::NullPointer,
                    format!(
                        "attempt to read from field '{}' on a null object reference",
                        name
                    ),
                );
                return false;
            }
            self.env.get_instance(obj, field_id)
        };
        let dst = if is_static { insn.a_21() } else { insn.a_12x() };
        store_by_kind(frame, dst, kind, value);
        true
    }

    pub(crate) fn do_field_put<const ACCESS_CHECK: bool>(
        &mut self,
        frame: &Frame,
        insn: InsnRef<'_>,
        is_static: bool,
        kind: PrimKind,
    ) -> bool {
        let field_idx = if is_static { insn.b_21c() } else { insn.c_22c() };
        let field_id = match self.env.resolve_field(
            self.thread,
            frame.method(),
            field_idx,
            is_static,
            true,
            kind,
            ACCESS_CHECK,
        ) {
            Some(f) => f,
            None => return false,
        };
        let target = if is_static {
            None
        } else {
            let obj = frame.get_ref(insn.b_12x());
            if obj.is_null() {
                let name = self.env.field(field_id).name.clone();
                self.throw(
                    ExceptionKind::NullPointer,
                    format!(
                        "attempt to write to field '{}' on a null object reference",
                        name
                    ),
                );
                return false;
            }
            Some(obj)
        };
        let src = if is_static { insn.a_21() } else { insn.a_12x() };
        let value = load_by_kind(frame, src, kind);

        if ACCESS_CHECK && kind == PrimKind::Object {
            let stored = value.as_ref();
            if !stored.is_null() {
                let field_class = self.env.field(field_id).class;
                if let Some(field_class) = field_class {
                    if !self.env.is_instance_of(stored, field_class) {
                        let value_desc = self
                            .env
                            .class_descriptor(self.env.object_class(stored))
                            .to_string();
                        let field_desc = self.env.class_descriptor(field_class).to_string();
                        self.throw(
                            ExceptionKind::VirtualMachine,
                            format!(
                                "put '{}' that is not instance of field '{}'",
                                value_desc, field_desc
                            ),
                        );
                        return false;
                    }
                }
            }
        }

        match target {
            None => self.env.set_static(field_id, value),
            Some(obj) => self.env.set_instance(obj, field_id, value),
        }
        true
    }

    pub(crate) fn do_iget_quick(
        &mut self,
        frame: &mut Frame,
        insn: InsnRef<'_>,
        kind: PrimKind,
    ) -> bool {
        let obj = frame.get_ref(insn.b_12x());
        if obj.is_null() {
            // The field index is gone in the quick form, so the message
            // cannot name the field.
            self.throw(
                ExceptionKind::NullPointer,
                "attempt to read from a null object reference".into(),
            );
            return false;
        }
        let offset = insn.c_22c() as u32;
        let value = self.env.get_instance_at(obj, offset, kind);
        store_by_kind(frame, insn.a_12x(), kind, value);
        true
    }

    pub(crate) fn do_iput_quick(
        &mut self,
        frame: &Frame,
        insn: InsnRef<'_>,
        kind: PrimKind,
    ) -> bool {
        let obj = frame.get_ref(insn.b_12x());
        if obj.is_null() {
            self.throw(
                ExceptionKind::NullPointer,
                "attempt to write to a null object reference".into(),
            );
            return false;
        }
        let offset = insn.c_22c() as u32;
        let value = load_by_kind(frame, insn.a_12x(), kind);
        self.env.set_instance_at(obj, offset, kind, value);
        true
    }
}
