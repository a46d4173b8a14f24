//! The dispatch loop.
//!
//! One iteration: publish the current position into the frame, poll the
//! suspend point, fire the position event when someone is listening,
//! decode, execute, then either advance or hand the frame to the unwinder.
//! The loop is monomorphized over the access-check flag so the checked and
//! checked-fast modes share one semantics definition without per-
//! instruction mode branching.

use crate::dex::{insn, CodeItem, InsnRef, Opcode};
use crate::frame::Frame;
use crate::interp::arith;
use crate::interp::unwind::UnwindStatus;
use crate::interp::{ExecResult, Interpreter};
use crate::runtime::thread::ExceptionKind;
use crate::runtime::{InvokeKind, PrimKind, Runtime};
use crate::value::Value;

impl<'a, R: Runtime> Interpreter<'a, R> {
    #[cold]
    fn unexpected_opcode(&self, opcode: u8, pc: u32) -> ! {
        panic!(
            "unexpected opcode {:#04x} at pc {:#x}; the verifier admits no such instruction",
            opcode, pc
        );
    }

    pub(crate) fn execute_impl<const ACCESS_CHECK: bool>(
        &mut self,
        frame: &mut Frame,
        code: &CodeItem,
        mut result_register: Value,
    ) -> ExecResult {
        let method_id = frame.method();
        let mut pc = frame.pc();
        if pc == 0 {
            self.thread.tracer_mut().method_entered(method_id);
        }

        loop {
            frame.set_pc(pc);
            self.thread.suspend().poll();
            if self.thread.tracer().wants_position_events() {
                self.thread.tracer_mut().position_moved(method_id, pc);
            }
            let insn = InsnRef::at(&code.insns, pc);
            let op = match insn.opcode() {
                Some(op) => op,
                None => self.unexpected_opcode(insn.opcode_byte(), pc),
            };
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("method {} pc {:#06x}: {:?}", method_id.0, pc, op);
            }

            macro_rules! handle_pending {
                () => {{
                    match self.find_handler(frame, code, pc) {
                        UnwindStatus::HandlerFound { pc: handler } => {
                            pc = handler;
                            continue;
                        }
                        UnwindStatus::FrameExhausted => return ExecResult::Unwound,
                    }
                }};
            }

            macro_rules! advance_or {
                ($ok:expr, $next:expr) => {{
                    if $ok {
                        pc = $next;
                    } else {
                        handle_pending!();
                    }
                }};
            }

            macro_rules! return_value {
                ($value:expr) => {{
                    let result = $value;
                    self.thread.tracer_mut().method_exited(method_id, pc, &result);
                    return ExecResult::Return(result);
                }};
            }

            macro_rules! invoke_arm {
                ($kind:expr, $range:expr) => {{
                    match self.do_invoke::<ACCESS_CHECK>(frame, insn, $kind, $range) {
                        Some(v) => {
                            result_register = v;
                            pc = insn.next();
                        }
                        None => {
                            result_register = Value::default();
                            handle_pending!();
                        }
                    }
                }};
            }

            macro_rules! int_binop {
                ($op:expr) => {{
                    let b = frame.get(insn.b_23x());
                    let c = frame.get(insn.c_23x());
                    frame.set(insn.a_21(), $op(b, c));
                    pc = insn.next();
                }};
            }

            macro_rules! long_binop {
                ($op:expr) => {{
                    let b = frame.get_wide(insn.b_23x());
                    let c = frame.get_wide(insn.c_23x());
                    frame.set_wide(insn.a_21(), $op(b, c));
                    pc = insn.next();
                }};
            }

            macro_rules! float_binop {
                ($op:expr) => {{
                    let b = frame.get_float(insn.b_23x());
                    let c = frame.get_float(insn.c_23x());
                    frame.set_float(insn.a_21(), $op(b, c));
                    pc = insn.next();
                }};
            }

            macro_rules! double_binop {
                ($op:expr) => {{
                    let b = frame.get_double(insn.b_23x());
                    let c = frame.get_double(insn.c_23x());
                    frame.set_double(insn.a_21(), $op(b, c));
                    pc = insn.next();
                }};
            }

            macro_rules! int_binop_2addr {
                ($op:expr) => {{
                    let a = frame.get(insn.a_12x());
                    let b = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), $op(a, b));
                    pc = insn.next();
                }};
            }

            macro_rules! long_binop_2addr {
                ($op:expr) => {{
                    let a = frame.get_wide(insn.a_12x());
                    let b = frame.get_wide(insn.b_12x());
                    frame.set_wide(insn.a_12x(), $op(a, b));
                    pc = insn.next();
                }};
            }

            macro_rules! float_binop_2addr {
                ($op:expr) => {{
                    let a = frame.get_float(insn.a_12x());
                    let b = frame.get_float(insn.b_12x());
                    frame.set_float(insn.a_12x(), $op(a, b));
                    pc = insn.next();
                }};
            }

            macro_rules! double_binop_2addr {
                ($op:expr) => {{
                    let a = frame.get_double(insn.a_12x());
                    let b = frame.get_double(insn.b_12x());
                    frame.set_double(insn.a_12x(), $op(a, b));
                    pc = insn.next();
                }};
            }

            macro_rules! int_binop_lit16 {
                ($op:expr) => {{
                    let b = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), $op(b, insn.c_22s()));
                    pc = insn.next();
                }};
            }

            macro_rules! int_binop_lit8 {
                ($op:expr) => {{
                    let b = frame.get(insn.b_23x());
                    frame.set(insn.a_21(), $op(b, insn.c_22b()));
                    pc = insn.next();
                }};
            }

            macro_rules! int_div_rem {
                ($helper:path, $dst:expr, $dividend:expr, $divisor:expr) => {{
                    match $helper($dividend, $divisor) {
                        Some(v) => {
                            frame.set($dst, v);
                            pc = insn.next();
                        }
                        None => {
                            self.throw(ExceptionKind::Arithmetic, "divide by zero".into());
                            handle_pending!();
                        }
                    }
                }};
            }

            macro_rules! long_div_rem {
                ($helper:path, $dst:expr, $dividend:expr, $divisor:expr) => {{
                    match $helper($dividend, $divisor) {
                        Some(v) => {
                            frame.set_wide($dst, v);
                            pc = insn.next();
                        }
                        None => {
                            self.throw(ExceptionKind::Arithmetic, "divide by zero".into());
                            handle_pending!();
                        }
                    }
                }};
            }

            match op {
                Opcode::Nop => pc = insn.next(),

                // ---- moves ----
                Opcode::Move => {
                    let v = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), v);
                    pc = insn.next();
                }
                Opcode::MoveFrom16 => {
                    let v = frame.get(insn.b_22x());
                    frame.set(insn.a_21(), v);
                    pc = insn.next();
                }
                Opcode::Move16 => {
                    let v = frame.get(insn.b_32x());
                    frame.set(insn.a_32x(), v);
                    pc = insn.next();
                }
                Opcode::MoveWide => {
                    let v = frame.get_wide(insn.b_12x());
                    frame.set_wide(insn.a_12x(), v);
                    pc = insn.next();
                }
                Opcode::MoveWideFrom16 => {
                    let v = frame.get_wide(insn.b_22x());
                    frame.set_wide(insn.a_21(), v);
                    pc = insn.next();
                }
                Opcode::MoveWide16 => {
                    let v = frame.get_wide(insn.b_32x());
                    frame.set_wide(insn.a_32x(), v);
                    pc = insn.next();
                }
                Opcode::MoveObject => {
                    let v = frame.get_ref(insn.b_12x());
                    frame.set_ref(insn.a_12x(), v);
                    pc = insn.next();
                }
                Opcode::MoveObjectFrom16 => {
                    let v = frame.get_ref(insn.b_22x());
                    frame.set_ref(insn.a_21(), v);
                    pc = insn.next();
                }
                Opcode::MoveObject16 => {
                    let v = frame.get_ref(insn.b_32x());
                    frame.set_ref(insn.a_32x(), v);
                    pc = insn.next();
                }
                Opcode::MoveResult => {
                    frame.set(insn.a_11x(), result_register.as_i32());
                    pc = insn.next();
                }
                Opcode::MoveResultWide => {
                    frame.set_wide(insn.a_11x(), result_register.as_i64());
                    pc = insn.next();
                }
                Opcode::MoveResultObject => {
                    frame.set_ref(insn.a_11x(), result_register.as_ref());
                    pc = insn.next();
                }
                Opcode::MoveException => match self.thread.take_pending() {
                    Some(exception) => {
                        frame.set_ref(insn.a_11x(), exception.object);
                        pc = insn.next();
                    }
                    None => {
                        self.throw(
                            ExceptionKind::VirtualMachine,
                            "move-exception with no exception in flight".into(),
                        );
                        handle_pending!();
                    }
                },

                // ---- returns ----
                Opcode::ReturnVoid => return_value!(Value::default()),
                Opcode::ReturnVoidBarrier => {
                    std::sync::atomic::fence(std::sync::atomic::Ordering::Release);
                    return_value!(Value::default());
                }
                Opcode::Return => return_value!(Value::from_i32(frame.get(insn.a_11x()))),
                Opcode::ReturnWide => return_value!(Value::from_i64(frame.get_wide(insn.a_11x()))),
                Opcode::ReturnObject => {
                    let obj = frame.get_ref(insn.a_11x());
                    if ACCESS_CHECK && !obj.is_null() {
                        match self.env.resolve_return_class(self.thread, method_id) {
                            None => handle_pending!(),
                            Some(return_class) => {
                                if !self.env.is_instance_of(obj, return_class) {
                                    let obj_desc = self
                                        .env
                                        .class_descriptor(self.env.object_class(obj))
                                        .to_string();
                                    let ret_desc =
                                        self.env.class_descriptor(return_class).to_string();
                                    self.throw(
                                        ExceptionKind::VirtualMachine,
                                        format!(
                                            "returning '{}' that is not instance of return type \
                                             '{}'",
                                            obj_desc, ret_desc
                                        ),
                                    );
                                    handle_pending!();
                                }
                            }
                        }
                    }
                    return_value!(Value::from_ref(obj));
                }

                // ---- constants ----
                Opcode::Const4 => {
                    frame.set(insn.a_12x(), insn.b_11n());
                    pc = insn.next();
                }
                Opcode::Const16 => {
                    frame.set(insn.a_21(), insn.b_21s());
                    pc = insn.next();
                }
                Opcode::Const => {
                    frame.set(insn.a_31(), insn.b_31());
                    pc = insn.next();
                }
                Opcode::ConstHigh16 => {
                    frame.set(insn.a_21(), (insn.b_21c() as i32) << 16);
                    pc = insn.next();
                }
                Opcode::ConstWide16 => {
                    frame.set_wide(insn.a_21(), insn.b_21s() as i64);
                    pc = insn.next();
                }
                Opcode::ConstWide32 => {
                    frame.set_wide(insn.a_31(), insn.b_31() as i64);
                    pc = insn.next();
                }
                Opcode::ConstWide => {
                    frame.set_wide(insn.a_21(), insn.b_51l());
                    pc = insn.next();
                }
                Opcode::ConstWideHigh16 => {
                    frame.set_wide(insn.a_21(), ((insn.b_21c() as u64) << 48) as i64);
                    pc = insn.next();
                }
                Opcode::ConstString => {
                    match self
                        .env
                        .resolve_string(self.thread, method_id, insn.b_21c() as u32)
                    {
                        Some(s) => {
                            frame.set_ref(insn.a_21(), s);
                            pc = insn.next();
                        }
                        None => handle_pending!(),
                    }
                }
                Opcode::ConstStringJumbo => {
                    match self
                        .env
                        .resolve_string(self.thread, method_id, insn.b_31() as u32)
                    {
                        Some(s) => {
                            frame.set_ref(insn.a_31(), s);
                            pc = insn.next();
                        }
                        None => handle_pending!(),
                    }
                }
                Opcode::ConstClass => {
                    match self
                        .env
                        .resolve_class(self.thread, method_id, insn.b_21c(), ACCESS_CHECK)
                    {
                        Some(class) => {
                            let mirror = self.env.class_mirror(class);
                            frame.set_ref(insn.a_21(), mirror);
                            pc = insn.next();
                        }
                        None => handle_pending!(),
                    }
                }

                // ---- monitors ----
                Opcode::MonitorEnter => {
                    let obj = frame.get_ref(insn.a_11x());
                    if obj.is_null() {
                        self.throw(ExceptionKind::NullPointer, "monitor-enter on null object".into());
                        handle_pending!();
                    }
                    let ok = self.env.monitor_enter(self.thread, obj);
                    advance_or!(ok, insn.next());
                }
                Opcode::MonitorExit => {
                    let obj = frame.get_ref(insn.a_11x());
                    if obj.is_null() {
                        self.throw(ExceptionKind::NullPointer, "monitor-exit on null object".into());
                        handle_pending!();
                    }
                    let ok = self.env.monitor_exit(self.thread, obj);
                    advance_or!(ok, insn.next());
                }

                // ---- type tests ----
                Opcode::CheckCast => {
                    match self
                        .env
                        .resolve_class(self.thread, method_id, insn.b_21c(), ACCESS_CHECK)
                    {
                        None => handle_pending!(),
                        Some(class) => {
                            let obj = frame.get_ref(insn.a_21());
                            if !obj.is_null() && !self.env.is_instance_of(obj, class) {
                                let obj_desc = self
                                    .env
                                    .class_descriptor(self.env.object_class(obj))
                                    .to_string();
                                let class_desc = self.env.class_descriptor(class).to_string();
                                self.throw(
                                    ExceptionKind::ClassCast,
                                    format!("{} cannot be cast to {}", obj_desc, class_desc),
                                );
                                handle_pending!();
                            }
                            pc = insn.next();
                        }
                    }
                }
                Opcode::InstanceOf => {
                    match self
                        .env
                        .resolve_class(self.thread, method_id, insn.c_22c(), ACCESS_CHECK)
                    {
                        None => handle_pending!(),
                        Some(class) => {
                            let obj = frame.get_ref(insn.b_12x());
                            let is = !obj.is_null() && self.env.is_instance_of(obj, class);
                            frame.set(insn.a_12x(), is as i32);
                            pc = insn.next();
                        }
                    }
                }

                // ---- arrays: length, allocation, bulk fill ----
                Opcode::ArrayLength => {
                    let array = frame.get_ref(insn.b_12x());
                    if array.is_null() {
                        self.throw(
                            ExceptionKind::NullPointer,
                            "length of null array".into(),
                        );
                        handle_pending!();
                    }
                    let length = self.env.array_length(array);
                    frame.set(insn.a_12x(), length);
                    pc = insn.next();
                }
                Opcode::NewInstance => {
                    match self
                        .env
                        .resolve_class(self.thread, method_id, insn.b_21c(), ACCESS_CHECK)
                    {
                        None => handle_pending!(),
                        Some(class) => {
                            if !self.env.ensure_initialized(self.thread, class) {
                                handle_pending!();
                            }
                            match self.env.alloc_object(self.thread, class) {
                                Some(obj) => {
                                    frame.set_ref(insn.a_21(), obj);
                                    pc = insn.next();
                                }
                                None => handle_pending!(),
                            }
                        }
                    }
                }
                Opcode::NewArray => {
                    let length = frame.get(insn.b_12x());
                    match self
                        .env
                        .resolve_class(self.thread, method_id, insn.c_22c(), ACCESS_CHECK)
                    {
                        None => handle_pending!(),
                        Some(array_class) => {
                            match self.env.alloc_array(self.thread, array_class, length) {
                                Some(array) => {
                                    frame.set_ref(insn.a_12x(), array);
                                    pc = insn.next();
                                }
                                None => handle_pending!(),
                            }
                        }
                    }
                }
                Opcode::FilledNewArray => {
                    match self.do_filled_new_array::<ACCESS_CHECK>(frame, insn, false) {
                        Some(v) => {
                            result_register = v;
                            pc = insn.next();
                        }
                        None => handle_pending!(),
                    }
                }
                Opcode::FilledNewArrayRange => {
                    match self.do_filled_new_array::<ACCESS_CHECK>(frame, insn, true) {
                        Some(v) => {
                            result_register = v;
                            pc = insn.next();
                        }
                        None => handle_pending!(),
                    }
                }
                Opcode::FillArrayData => {
                    let array = frame.get_ref(insn.a_31());
                    if array.is_null() {
                        self.throw(
                            ExceptionKind::NullPointer,
                            "null array in fill-array-data".into(),
                        );
                        handle_pending!();
                    }
                    let payload = insn::array_data(&code.insns, insn.relative(insn.b_31()));
                    let length = self.env.array_length(array);
                    if payload.element_count as i32 > length {
                        self.throw(
                            ExceptionKind::ArrayIndexOutOfBounds,
                            format!(
                                "failed array fill; length={}; index={}",
                                length, payload.element_count
                            ),
                        );
                        handle_pending!();
                    }
                    let kind = self.env.array_element_kind(array);
                    if kind == PrimKind::Object {
                        self.throw(
                            ExceptionKind::VirtualMachine,
                            "fill-array-data on an object array".into(),
                        );
                        handle_pending!();
                    }
                    for (i, &raw) in payload.elements.iter().enumerate() {
                        let value = match kind {
                            PrimKind::Boolean => Value::from_i32(raw as u8 as i32),
                            PrimKind::Byte => Value::from_i32(raw as u8 as i8 as i32),
                            PrimKind::Char => Value::from_i32(raw as u16 as i32),
                            PrimKind::Short => Value::from_i32(raw as u16 as i16 as i32),
                            PrimKind::Int => Value::from_i32(raw as u32 as i32),
                            PrimKind::Long => Value::from_i64(raw as i64),
                            // Ruled out just above.
                            PrimKind::Object => Value::default(),
                        };
                        self.env.array_put(array, i as i32, value);
                    }
                    pc = insn.next();
                }

                // ---- throw ----
                Opcode::Throw => {
                    let exception = frame.get_ref(insn.a_11x());
                    if exception.is_null() {
                        self.throw(ExceptionKind::NullPointer, "throw with null exception".into());
                    } else if ACCESS_CHECK
                        && !self.env.is_instance_of(exception, self.env.throwable_class())
                    {
                        let desc = self
                            .env
                            .class_descriptor(self.env.object_class(exception))
                            .to_string();
                        self.throw(
                            ExceptionKind::VirtualMachine,
                            format!("throwing '{}' that is not a throwable", desc),
                        );
                    } else {
                        self.throw_object(exception);
                    }
                    handle_pending!();
                }

                // ---- branches ----
                Opcode::Goto => pc = insn.relative(insn.a_10t()),
                Opcode::Goto16 => pc = insn.relative(insn.a_20t()),
                Opcode::Goto32 => pc = insn.relative(insn.a_30t()),
                Opcode::PackedSwitch => {
                    let test = frame.get(insn.a_31());
                    let target =
                        insn::packed_switch_target(&code.insns, insn.relative(insn.b_31()), test);
                    pc = match target {
                        Some(offset) => insn.relative(offset),
                        None => insn.next(),
                    };
                }
                Opcode::SparseSwitch => {
                    let test = frame.get(insn.a_31());
                    let target =
                        insn::sparse_switch_target(&code.insns, insn.relative(insn.b_31()), test);
                    pc = match target {
                        Some(offset) => insn.relative(offset),
                        None => insn.next(),
                    };
                }

                // ---- comparisons ----
                Opcode::CmplFloat => {
                    let v1 = frame.get_float(insn.b_23x());
                    let v2 = frame.get_float(insn.c_23x());
                    let result = if v1 > v2 {
                        1
                    } else if v1 == v2 {
                        0
                    } else {
                        -1
                    };
                    frame.set(insn.a_21(), result);
                    pc = insn.next();
                }
                Opcode::CmpgFloat => {
                    let v1 = frame.get_float(insn.b_23x());
                    let v2 = frame.get_float(insn.c_23x());
                    let result = if v1 < v2 {
                        -1
                    } else if v1 == v2 {
                        0
                    } else {
                        1
                    };
                    frame.set(insn.a_21(), result);
                    pc = insn.next();
                }
                Opcode::CmplDouble => {
                    let v1 = frame.get_double(insn.b_23x());
                    let v2 = frame.get_double(insn.c_23x());
                    let result = if v1 > v2 {
                        1
                    } else if v1 == v2 {
                        0
                    } else {
                        -1
                    };
                    frame.set(insn.a_21(), result);
                    pc = insn.next();
                }
                Opcode::CmpgDouble => {
                    let v1 = frame.get_double(insn.b_23x());
                    let v2 = frame.get_double(insn.c_23x());
                    let result = if v1 < v2 {
                        -1
                    } else if v1 == v2 {
                        0
                    } else {
                        1
                    };
                    frame.set(insn.a_21(), result);
                    pc = insn.next();
                }
                Opcode::CmpLong => {
                    let v1 = frame.get_wide(insn.b_23x());
                    let v2 = frame.get_wide(insn.c_23x());
                    let result = if v1 > v2 {
                        1
                    } else if v1 == v2 {
                        0
                    } else {
                        -1
                    };
                    frame.set(insn.a_21(), result);
                    pc = insn.next();
                }

                // ---- conditional branches ----
                Opcode::IfEq => {
                    pc = if frame.get(insn.a_12x()) == frame.get(insn.b_12x()) {
                        insn.relative(insn.c_22s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfNe => {
                    pc = if frame.get(insn.a_12x()) != frame.get(insn.b_12x()) {
                        insn.relative(insn.c_22s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfLt => {
                    pc = if frame.get(insn.a_12x()) < frame.get(insn.b_12x()) {
                        insn.relative(insn.c_22s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfGe => {
                    pc = if frame.get(insn.a_12x()) >= frame.get(insn.b_12x()) {
                        insn.relative(insn.c_22s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfGt => {
                    pc = if frame.get(insn.a_12x()) > frame.get(insn.b_12x()) {
                        insn.relative(insn.c_22s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfLe => {
                    pc = if frame.get(insn.a_12x()) <= frame.get(insn.b_12x()) {
                        insn.relative(insn.c_22s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfEqz => {
                    pc = if frame.get(insn.a_21()) == 0 {
                        insn.relative(insn.b_21s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfNez => {
                    pc = if frame.get(insn.a_21()) != 0 {
                        insn.relative(insn.b_21s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfLtz => {
                    pc = if frame.get(insn.a_21()) < 0 {
                        insn.relative(insn.b_21s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfGez => {
                    pc = if frame.get(insn.a_21()) >= 0 {
                        insn.relative(insn.b_21s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfGtz => {
                    pc = if frame.get(insn.a_21()) > 0 {
                        insn.relative(insn.b_21s())
                    } else {
                        insn.next()
                    };
                }
                Opcode::IfLez => {
                    pc = if frame.get(insn.a_21()) <= 0 {
                        insn.relative(insn.b_21s())
                    } else {
                        insn.next()
                    };
                }

                // ---- array element access ----
                Opcode::Aget => advance_or!(self.do_aget(frame, insn, PrimKind::Int), insn.next()),
                Opcode::AgetWide => {
                    advance_or!(self.do_aget(frame, insn, PrimKind::Long), insn.next())
                }
                Opcode::AgetObject => {
                    advance_or!(self.do_aget(frame, insn, PrimKind::Object), insn.next())
                }
                Opcode::AgetBoolean => {
                    advance_or!(self.do_aget(frame, insn, PrimKind::Boolean), insn.next())
                }
                Opcode::AgetByte => {
                    advance_or!(self.do_aget(frame, insn, PrimKind::Byte), insn.next())
                }
                Opcode::AgetChar => {
                    advance_or!(self.do_aget(frame, insn, PrimKind::Char), insn.next())
                }
                Opcode::AgetShort => {
                    advance_or!(self.do_aget(frame, insn, PrimKind::Short), insn.next())
                }
                Opcode::Aput => advance_or!(self.do_aput(frame, insn, PrimKind::Int), insn.next()),
                Opcode::AputWide => {
                    advance_or!(self.do_aput(frame, insn, PrimKind::Long), insn.next())
                }
                Opcode::AputObject => {
                    advance_or!(self.do_aput(frame, insn, PrimKind::Object), insn.next())
                }
                Opcode::AputBoolean => {
                    advance_or!(self.do_aput(frame, insn, PrimKind::Boolean), insn.next())
                }
                Opcode::AputByte => {
                    advance_or!(self.do_aput(frame, insn, PrimKind::Byte), insn.next())
                }
                Opcode::AputChar => {
                    advance_or!(self.do_aput(frame, insn, PrimKind::Char), insn.next())
                }
                Opcode::AputShort => {
                    advance_or!(self.do_aput(frame, insn, PrimKind::Short), insn.next())
                }

                // ---- instance fields ----
                Opcode::Iget => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, false, PrimKind::Int),
                    insn.next()
                ),
                Opcode::IgetWide => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, false, PrimKind::Long),
                    insn.next()
                ),
                Opcode::IgetObject => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, false, PrimKind::Object),
                    insn.next()
                ),
                Opcode::IgetBoolean => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, false, PrimKind::Boolean),
                    insn.next()
                ),
                Opcode::IgetByte => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, false, PrimKind::Byte),
                    insn.next()
                ),
                Opcode::IgetChar => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, false, PrimKind::Char),
                    insn.next()
                ),
                Opcode::IgetShort => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, false, PrimKind::Short),
                    insn.next()
                ),
                Opcode::IgetQuick => {
                    advance_or!(self.do_iget_quick(frame, insn, PrimKind::Int), insn.next())
                }
                Opcode::IgetWideQuick => {
                    advance_or!(self.do_iget_quick(frame, insn, PrimKind::Long), insn.next())
                }
                Opcode::IgetObjectQuick => {
                    advance_or!(self.do_iget_quick(frame, insn, PrimKind::Object), insn.next())
                }
                Opcode::Iput => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, false, PrimKind::Int),
                    insn.next()
                ),
                Opcode::IputWide => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, false, PrimKind::Long),
                    insn.next()
                ),
                Opcode::IputObject => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, false, PrimKind::Object),
                    insn.next()
                ),
                Opcode::IputBoolean => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, false, PrimKind::Boolean),
                    insn.next()
                ),
                Opcode::IputByte => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, false, PrimKind::Byte),
                    insn.next()
                ),
                Opcode::IputChar => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, false, PrimKind::Char),
                    insn.next()
                ),
                Opcode::IputShort => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, false, PrimKind::Short),
                    insn.next()
                ),
                Opcode::IputQuick => {
                    advance_or!(self.do_iput_quick(frame, insn, PrimKind::Int), insn.next())
                }
                Opcode::IputWideQuick => {
                    advance_or!(self.do_iput_quick(frame, insn, PrimKind::Long), insn.next())
                }
                Opcode::IputObjectQuick => {
                    advance_or!(self.do_iput_quick(frame, insn, PrimKind::Object), insn.next())
                }

                // ---- static fields ----
                Opcode::Sget => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, true, PrimKind::Int),
                    insn.next()
                ),
                Opcode::SgetWide => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, true, PrimKind::Long),
                    insn.next()
                ),
                Opcode::SgetObject => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, true, PrimKind::Object),
                    insn.next()
                ),
                Opcode::SgetBoolean => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, true, PrimKind::Boolean),
                    insn.next()
                ),
                Opcode::SgetByte => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, true, PrimKind::Byte),
                    insn.next()
                ),
                Opcode::SgetChar => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, true, PrimKind::Char),
                    insn.next()
                ),
                Opcode::SgetShort => advance_or!(
                    self.do_field_get::<ACCESS_CHECK>(frame, insn, true, PrimKind::Short),
                    insn.next()
                ),
                Opcode::Sput => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, true, PrimKind::Int),
                    insn.next()
                ),
                Opcode::SputWide => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, true, PrimKind::Long),
                    insn.next()
                ),
                Opcode::SputObject => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, true, PrimKind::Object),
                    insn.next()
                ),
                Opcode::SputBoolean => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, true, PrimKind::Boolean),
                    insn.next()
                ),
                Opcode::SputByte => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, true, PrimKind::Byte),
                    insn.next()
                ),
                Opcode::SputChar => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, true, PrimKind::Char),
                    insn.next()
                ),
                Opcode::SputShort => advance_or!(
                    self.do_field_put::<ACCESS_CHECK>(frame, insn, true, PrimKind::Short),
                    insn.next()
                ),

                // ---- invocations ----
                Opcode::InvokeVirtual => invoke_arm!(InvokeKind::Virtual, false),
                Opcode::InvokeSuper => invoke_arm!(InvokeKind::Super, false),
                Opcode::InvokeDirect => invoke_arm!(InvokeKind::Direct, false),
                Opcode::InvokeStatic => invoke_arm!(InvokeKind::Static, false),
                Opcode::InvokeInterface => invoke_arm!(InvokeKind::Interface, false),
                Opcode::InvokeVirtualRange => invoke_arm!(InvokeKind::Virtual, true),
                Opcode::InvokeSuperRange => invoke_arm!(InvokeKind::Super, true),
                Opcode::InvokeDirectRange => invoke_arm!(InvokeKind::Direct, true),
                Opcode::InvokeStaticRange => invoke_arm!(InvokeKind::Static, true),
                Opcode::InvokeInterfaceRange => invoke_arm!(InvokeKind::Interface, true),
                Opcode::InvokeVirtualQuick => {
                    match self.do_invoke_virtual_quick(frame, insn, false) {
                        Some(v) => {
                            result_register = v;
                            pc = insn.next();
                        }
                        None => {
                            result_register = Value::default();
                            handle_pending!();
                        }
                    }
                }
                Opcode::InvokeVirtualRangeQuick => {
                    match self.do_invoke_virtual_quick(frame, insn, true) {
                        Some(v) => {
                            result_register = v;
                            pc = insn.next();
                        }
                        None => {
                            result_register = Value::default();
                            handle_pending!();
                        }
                    }
                }

                // ---- unary operations ----
                Opcode::NegInt => {
                    let v = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), v.wrapping_neg());
                    pc = insn.next();
                }
                Opcode::NotInt => {
                    let v = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), !v);
                    pc = insn.next();
                }
                Opcode::NegLong => {
                    let v = frame.get_wide(insn.b_12x());
                    frame.set_wide(insn.a_12x(), v.wrapping_neg());
                    pc = insn.next();
                }
                Opcode::NotLong => {
                    let v = frame.get_wide(insn.b_12x());
                    frame.set_wide(insn.a_12x(), !v);
                    pc = insn.next();
                }
                Opcode::NegFloat => {
                    let v = frame.get_float(insn.b_12x());
                    frame.set_float(insn.a_12x(), -v);
                    pc = insn.next();
                }
                Opcode::NegDouble => {
                    let v = frame.get_double(insn.b_12x());
                    frame.set_double(insn.a_12x(), -v);
                    pc = insn.next();
                }

                // ---- conversions ----
                Opcode::IntToLong => {
                    let v = frame.get(insn.b_12x());
                    frame.set_wide(insn.a_12x(), v as i64);
                    pc = insn.next();
                }
                Opcode::IntToFloat => {
                    let v = frame.get(insn.b_12x());
                    frame.set_float(insn.a_12x(), v as f32);
                    pc = insn.next();
                }
                Opcode::IntToDouble => {
                    let v = frame.get(insn.b_12x());
                    frame.set_double(insn.a_12x(), v as f64);
                    pc = insn.next();
                }
                Opcode::LongToInt => {
                    let v = frame.get_wide(insn.b_12x());
                    frame.set(insn.a_12x(), v as i32);
                    pc = insn.next();
                }
                Opcode::LongToFloat => {
                    let v = frame.get_wide(insn.b_12x());
                    frame.set_float(insn.a_12x(), v as f32);
                    pc = insn.next();
                }
                Opcode::LongToDouble => {
                    let v = frame.get_wide(insn.b_12x());
                    frame.set_double(insn.a_12x(), v as f64);
                    pc = insn.next();
                }
                Opcode::FloatToInt => {
                    let v = frame.get_float(insn.b_12x());
                    frame.set(insn.a_12x(), arith::float_to_int(v));
                    pc = insn.next();
                }
                Opcode::FloatToLong => {
                    let v = frame.get_float(insn.b_12x());
                    frame.set_wide(insn.a_12x(), arith::float_to_long(v));
                    pc = insn.next();
                }
                Opcode::FloatToDouble => {
                    let v = frame.get_float(insn.b_12x());
                    frame.set_double(insn.a_12x(), v as f64);
                    pc = insn.next();
                }
                Opcode::DoubleToInt => {
                    let v = frame.get_double(insn.b_12x());
                    frame.set(insn.a_12x(), arith::double_to_int(v));
                    pc = insn.next();
                }
                Opcode::DoubleToLong => {
                    let v = frame.get_double(insn.b_12x());
                    frame.set_wide(insn.a_12x(), arith::double_to_long(v));
                    pc = insn.next();
                }
                Opcode::DoubleToFloat => {
                    let v = frame.get_double(insn.b_12x());
                    frame.set_float(insn.a_12x(), v as f32);
                    pc = insn.next();
                }
                Opcode::IntToByte => {
                    let v = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), v as i8 as i32);
                    pc = insn.next();
                }
                Opcode::IntToChar => {
                    let v = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), v as u16 as i32);
                    pc = insn.next();
                }
                Opcode::IntToShort => {
                    let v = frame.get(insn.b_12x());
                    frame.set(insn.a_12x(), v as i16 as i32);
                    pc = insn.next();
                }

                // ---- integer arithmetic ----
                Opcode::AddInt => int_binop!(|b: i32, c: i32| b.wrapping_add(c)),
                Opcode::SubInt => int_binop!(|b: i32, c: i32| b.wrapping_sub(c)),
                Opcode::MulInt => int_binop!(|b: i32, c: i32| b.wrapping_mul(c)),
                Opcode::DivInt => int_div_rem!(
                    arith::int_div,
                    insn.a_21(),
                    frame.get(insn.b_23x()),
                    frame.get(insn.c_23x())
                ),
                Opcode::RemInt => int_div_rem!(
                    arith::int_rem,
                    insn.a_21(),
                    frame.get(insn.b_23x()),
                    frame.get(insn.c_23x())
                ),
                Opcode::AndInt => int_binop!(|b: i32, c: i32| b & c),
                Opcode::OrInt => int_binop!(|b: i32, c: i32| b | c),
                Opcode::XorInt => int_binop!(|b: i32, c: i32| b ^ c),
                Opcode::ShlInt => int_binop!(|b: i32, c: i32| b.wrapping_shl((c & 0x1f) as u32)),
                Opcode::ShrInt => int_binop!(|b: i32, c: i32| b >> (c & 0x1f)),
                Opcode::UshrInt => {
                    int_binop!(|b: i32, c: i32| ((b as u32) >> (c & 0x1f)) as i32)
                }

                // ---- long arithmetic ----
                Opcode::AddLong => long_binop!(|b: i64, c: i64| b.wrapping_add(c)),
                Opcode::SubLong => long_binop!(|b: i64, c: i64| b.wrapping_sub(c)),
                Opcode::MulLong => long_binop!(|b: i64, c: i64| b.wrapping_mul(c)),
                Opcode::DivLong => long_div_rem!(
                    arith::long_div,
                    insn.a_21(),
                    frame.get_wide(insn.b_23x()),
                    frame.get_wide(insn.c_23x())
                ),
                Opcode::RemLong => long_div_rem!(
                    arith::long_rem,
                    insn.a_21(),
                    frame.get_wide(insn.b_23x()),
                    frame.get_wide(insn.c_23x())
                ),
                Opcode::AndLong => long_binop!(|b: i64, c: i64| b & c),
                Opcode::OrLong => long_binop!(|b: i64, c: i64| b | c),
                Opcode::XorLong => long_binop!(|b: i64, c: i64| b ^ c),
                Opcode::ShlLong => {
                    let b = frame.get_wide(insn.b_23x());
                    let distance = frame.get(insn.c_23x());
                    frame.set_wide(insn.a_21(), b.wrapping_shl((distance & 0x3f) as u32));
                    pc = insn.next();
                }
                Opcode::ShrLong => {
                    let b = frame.get_wide(insn.b_23x());
                    let distance = frame.get(insn.c_23x());
                    frame.set_wide(insn.a_21(), b >> (distance & 0x3f));
                    pc = insn.next();
                }
                Opcode::UshrLong => {
                    let b = frame.get_wide(insn.b_23x());
                    let distance = frame.get(insn.c_23x());
                    frame.set_wide(insn.a_21(), ((b as u64) >> (distance & 0x3f)) as i64);
                    pc = insn.next();
                }

                // ---- floating-point arithmetic ----
                Opcode::AddFloat => float_binop!(|b: f32, c: f32| b + c),
                Opcode::SubFloat => float_binop!(|b: f32, c: f32| b - c),
                Opcode::MulFloat => float_binop!(|b: f32, c: f32| b * c),
                Opcode::DivFloat => float_binop!(|b: f32, c: f32| b / c),
                Opcode::RemFloat => float_binop!(|b: f32, c: f32| b % c),
                Opcode::AddDouble => double_binop!(|b: f64, c: f64| b + c),
                Opcode::SubDouble => double_binop!(|b: f64, c: f64| b - c),
                Opcode::MulDouble => double_binop!(|b: f64, c: f64| b * c),
                Opcode::DivDouble => double_binop!(|b: f64, c: f64| b / c),
                Opcode::RemDouble => double_binop!(|b: f64, c: f64| b % c),

                // ---- two-address forms ----
                Opcode::AddInt2addr => int_binop_2addr!(|a: i32, b: i32| a.wrapping_add(b)),
                Opcode::SubInt2addr => int_binop_2addr!(|a: i32, b: i32| a.wrapping_sub(b)),
                Opcode::MulInt2addr => int_binop_2addr!(|a: i32, b: i32| a.wrapping_mul(b)),
                Opcode::DivInt2addr => int_div_rem!(
                    arith::int_div,
                    insn.a_12x(),
                    frame.get(insn.a_12x()),
                    frame.get(insn.b_12x())
                ),
                Opcode::RemInt2addr => int_div_rem!(
                    arith::int_rem,
                    insn.a_12x(),
                    frame.get(insn.a_12x()),
                    frame.get(insn.b_12x())
                ),
                Opcode::AndInt2addr => int_binop_2addr!(|a: i32, b: i32| a & b),
                Opcode::OrInt2addr => int_binop_2addr!(|a: i32, b: i32| a | b),
                Opcode::XorInt2addr => int_binop_2addr!(|a: i32, b: i32| a ^ b),
                Opcode::ShlInt2addr => {
                    int_binop_2addr!(|a: i32, b: i32| a.wrapping_shl((b & 0x1f) as u32))
                }
                Opcode::ShrInt2addr => int_binop_2addr!(|a: i32, b: i32| a >> (b & 0x1f)),
                Opcode::UshrInt2addr => {
                    int_binop_2addr!(|a: i32, b: i32| ((a as u32) >> (b & 0x1f)) as i32)
                }
                Opcode::AddLong2addr => long_binop_2addr!(|a: i64, b: i64| a.wrapping_add(b)),
                Opcode::SubLong2addr => long_binop_2addr!(|a: i64, b: i64| a.wrapping_sub(b)),
                Opcode::MulLong2addr => long_binop_2addr!(|a: i64, b: i64| a.wrapping_mul(b)),
                Opcode::DivLong2addr => long_div_rem!(
                    arith::long_div,
                    insn.a_12x(),
                    frame.get_wide(insn.a_12x()),
                    frame.get_wide(insn.b_12x())
                ),
                Opcode::RemLong2addr => long_div_rem!(
                    arith::long_rem,
                    insn.a_12x(),
                    frame.get_wide(insn.a_12x()),
                    frame.get_wide(insn.b_12x())
                ),
                Opcode::AndLong2addr => long_binop_2addr!(|a: i64, b: i64| a & b),
                Opcode::OrLong2addr => long_binop_2addr!(|a: i64, b: i64| a | b),
                Opcode::XorLong2addr => long_binop_2addr!(|a: i64, b: i64| a ^ b),
                Opcode::ShlLong2addr => {
                    let a = frame.get_wide(insn.a_12x());
                    let distance = frame.get(insn.b_12x());
                    frame.set_wide(insn.a_12x(), a.wrapping_shl((distance & 0x3f) as u32));
                    pc = insn.next();
                }
                Opcode::ShrLong2addr => {
                    let a = frame.get_wide(insn.a_12x());
                    let distance = frame.get(insn.b_12x());
                    frame.set_wide(insn.a_12x(), a >> (distance & 0x3f));
                    pc = insn.next();
                }
                Opcode::UshrLong2addr => {
                    let a = frame.get_wide(insn.a_12x());
                    let distance = frame.get(insn.b_12x());
                    frame.set_wide(insn.a_12x(), ((a as u64) >> (distance & 0x3f)) as i64);
                    pc = insn.next();
                }
                Opcode::AddFloat2addr => float_binop_2addr!(|a: f32, b: f32| a + b),
                Opcode::SubFloat2addr => float_binop_2addr!(|a: f32, b: f32| a - b),
                Opcode::MulFloat2addr => float_binop_2addr!(|a: f32, b: f32| a * b),
                Opcode::DivFloat2addr => float_binop_2addr!(|a: f32, b: f32| a / b),
                Opcode::RemFloat2addr => float_binop_2addr!(|a: f32, b: f32| a % b),
                Opcode::AddDouble2addr => double_binop_2addr!(|a: f64, b: f64| a + b),
                Opcode::SubDouble2addr => double_binop_2addr!(|a: f64, b: f64| a - b),
                Opcode::MulDouble2addr => double_binop_2addr!(|a: f64, b: f64| a * b),
                Opcode::DivDouble2addr => double_binop_2addr!(|a: f64, b: f64| a / b),
                Opcode::RemDouble2addr => double_binop_2addr!(|a: f64, b: f64| a % b),

                // ---- literal forms ----
                Opcode::AddIntLit16 => int_binop_lit16!(|b: i32, lit: i32| b.wrapping_add(lit)),
                Opcode::RsubInt => int_binop_lit16!(|b: i32, lit: i32| lit.wrapping_sub(b)),
                Opcode::MulIntLit16 => int_binop_lit16!(|b: i32, lit: i32| b.wrapping_mul(lit)),
                Opcode::DivIntLit16 => int_div_rem!(
                    arith::int_div,
                    insn.a_12x(),
                    frame.get(insn.b_12x()),
                    insn.c_22s()
                ),
                Opcode::RemIntLit16 => int_div_rem!(
                    arith::int_rem,
                    insn.a_12x(),
                    frame.get(insn.b_12x()),
                    insn.c_22s()
                ),
                Opcode::AndIntLit16 => int_binop_lit16!(|b: i32, lit: i32| b & lit),
                Opcode::OrIntLit16 => int_binop_lit16!(|b: i32, lit: i32| b | lit),
                Opcode::XorIntLit16 => int_binop_lit16!(|b: i32, lit: i32| b ^ lit),
                Opcode::AddIntLit8 => int_binop_lit8!(|b: i32, lit: i32| b.wrapping_add(lit)),
                Opcode::RsubIntLit8 => int_binop_lit8!(|b: i32, lit: i32| lit.wrapping_sub(b)),
                Opcode::MulIntLit8 => int_binop_lit8!(|b: i32, lit: i32| b.wrapping_mul(lit)),
                Opcode::DivIntLit8 => int_div_rem!(
                    arith::int_div,
                    insn.a_21(),
                    frame.get(insn.b_23x()),
                    insn.c_22b()
                ),
                Opcode::RemIntLit8 => int_div_rem!(
                    arith::int_rem,
                    insn.a_21(),
                    frame.get(insn.b_23x()),
                    insn.c_22b()
                ),
                Opcode::AndIntLit8 => int_binop_lit8!(|b: i32, lit: i32| b & lit),
                Opcode::OrIntLit8 => int_binop_lit8!(|b: i32, lit: i32| b | lit),
                Opcode::XorIntLit8 => int_binop_lit8!(|b: i32, lit: i32| b ^ lit),
                Opcode::ShlIntLit8 => {
                    int_binop_lit8!(|b: i32, lit: i32| b.wrapping_shl((lit & 0x1f) as u32))
                }
                Opcode::ShrIntLit8 => int_binop_lit8!(|b: i32, lit: i32| b >> (lit & 0x1f)),
                Opcode::UshrIntLit8 => {
                    int_binop_lit8!(|b: i32, lit: i32| ((b as u32) >> (lit & 0x1f)) as i32)
                }
            }
        }
    }
}
