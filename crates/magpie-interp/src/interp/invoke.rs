//! The invocation engine: target resolution per call kind, callee frame
//! construction, argument marshaling, and the synchronous recursion into
//! the dispatch loop.
//!
//! The null-receiver check runs before resolution so a bad receiver never
//! produces resolution side effects. The native-stack headroom guard runs
//! before the callee frame is constructed.

use std::sync::Arc;

use crate::dex::InsnRef;
use crate::frame::Frame;
use crate::interp::{ExecResult, Interpreter};
use crate::runtime::thread::ExceptionKind;
use crate::runtime::{InvokeKind, Method, MethodId, Runtime};
use crate::value::{ObjRef, Value};

impl<'a, R: Runtime> Interpreter<'a, R> {
    /// Resolves and performs one invoke instruction, returning the callee's
    /// result for the caller's result register.
    pub(crate) fn do_invoke<const ACCESS_CHECK: bool>(
        &mut self,
        frame: &Frame,
        insn: InsnRef<'_>,
        kind: InvokeKind,
        range: bool,
    ) -> Option<Value> {
        let method_idx = insn.b_35c();
        let first_reg = if range { insn.c_3rc() } else { insn.args_35c()[0] };

        let receiver = if kind.has_receiver() {
            let r = frame.get_ref(first_reg);
            if r.is_null() {
                self.throw(
                    ExceptionKind::NullPointer,
                    "attempt to invoke a method on a null object reference".into(),
                );
                return None;
            }
            r
        } else {
            ObjRef::NULL
        };

        let resolved = match self.env.resolve_method(
            self.thread,
            frame.method(),
            method_idx,
            kind,
            ACCESS_CHECK,
        ) {
            Some(m) => m,
            None => return None,
        };

        if ACCESS_CHECK {
            // The resolved target must agree with the call kind the site
            // declared; a mismatch is a linkage break, not verifier-checked
            // input.
            let is_static_target = self.env.method(resolved).is_static();
            if is_static_target != matches!(kind, InvokeKind::Static) {
                let name = self.env.method(resolved).name.clone();
                self.throw(
                    ExceptionKind::IncompatibleClassChange,
                    format!("call kind does not match the resolved method '{}'", name),
                );
                return None;
            }
        }

        let target = match kind {
            InvokeKind::Static | InvokeKind::Direct => resolved,
            InvokeKind::Virtual => {
                let receiver_class = self.env.object_class(receiver);
                let vtable_idx = match self.env.method(resolved).vtable_index {
                    Some(i) => i,
                    None => {
                        let name = self.env.method(resolved).name.clone();
                        self.throw(
                            ExceptionKind::IncompatibleClassChange,
                            format!("method '{}' has no dispatch-table slot", name),
                        );
                        return None;
                    }
                };
                match self.env.vtable_entry(receiver_class, vtable_idx) {
                    Some(m) => m,
                    None => {
                        let desc = self.env.class_descriptor(receiver_class).to_string();
                        self.throw(
                            ExceptionKind::NoSuchMethod,
                            format!("no dispatch-table entry {} in {}", vtable_idx, desc),
                        );
                        return None;
                    }
                }
            }
            InvokeKind::Interface => {
                let receiver_class = self.env.object_class(receiver);
                match self.env.interface_target(receiver_class, resolved) {
                    Some(m) => m,
                    None => {
                        let desc = self.env.class_descriptor(receiver_class).to_string();
                        let name = self.env.method(resolved).name.clone();
                        self.throw(
                            ExceptionKind::IncompatibleClassChange,
                            format!("class {} does not implement '{}'", desc, name),
                        );
                        return None;
                    }
                }
            }
            InvokeKind::Super => {
                let caller_class = self.env.method(frame.method()).declaring_class;
                let superclass = match self.env.super_class(caller_class) {
                    Some(s) => s,
                    None => {
                        self.throw(
                            ExceptionKind::NoSuchMethod,
                            "invoke-super in a class without a superclass".into(),
                        );
                        return None;
                    }
                };
                let vtable_idx = match self.env.method(resolved).vtable_index {
                    Some(i) => i,
                    None => {
                        let name = self.env.method(resolved).name.clone();
                        self.throw(
                            ExceptionKind::IncompatibleClassChange,
                            format!("method '{}' has no dispatch-table slot", name),
                        );
                        return None;
                    }
                };
                match self.env.vtable_entry(superclass, vtable_idx) {
                    Some(m) => m,
                    None => {
                        let desc = self.env.class_descriptor(superclass).to_string();
                        self.throw(
                            ExceptionKind::NoSuchMethod,
                            format!("no dispatch-table entry {} in {}", vtable_idx, desc),
                        );
                        return None;
                    }
                }
            }
        };

        if self.env.method(target).is_abstract() {
            let name = self.env.method(target).name.clone();
            self.throw(
                ExceptionKind::AbstractMethod,
                format!("abstract method \"{}\"", name),
            );
            return None;
        }

        self.call_resolved(frame, insn, range, target)
    }

    /// The quickened virtual invoke: the dispatch-table index was baked in
    /// by an earlier pass, so method-index resolution is skipped entirely.
    /// The null-receiver check still runs.
    pub(crate) fn do_invoke_virtual_quick(
        &mut self,
        frame: &Frame,
        insn: InsnRef<'_>,
        range: bool,
    ) -> Option<Value> {
        let first_reg = if range { insn.c_3rc() } else { insn.args_35c()[0] };
        let receiver = frame.get_ref(first_reg);
        if receiver.is_null() {
            // The method index is gone in the quick form, so the message
            // cannot name the method.
            self.throw(
                ExceptionKind::NullPointer,
                "attempt to invoke a method on a null object reference".into(),
            );
            return None;
        }
        let vtable_idx = insn.b_35c();
        let receiver_class = self.env.object_class(receiver);
        let target = match self.env.vtable_entry(receiver_class, vtable_idx) {
            Some(m) => m,
            None => {
                let desc = self.env.class_descriptor(receiver_class).to_string();
                self.throw(
                    ExceptionKind::IncompatibleClassChange,
                    format!("no dispatch-table entry {} in {}", vtable_idx, desc),
                );
                return None;
            }
        };
        if self.env.method(target).is_abstract() {
            let name = self.env.method(target).name.clone();
            self.throw(
                ExceptionKind::AbstractMethod,
                format!("abstract method \"{}\"", name),
            );
            return None;
        }
        self.call_resolved(frame, insn, range, target)
    }

    /// Builds the callee frame, marshals receiver and arguments, and runs
    /// the callee to completion.
    fn call_resolved(
        &mut self,
        caller: &Frame,
        insn: InsnRef<'_>,
        range: bool,
        target: MethodId,
    ) -> Option<Value> {
        let callee = self.env.method(target).clone();
        if !self.thread.enter_frame() {
            self.throw(
                ExceptionKind::StackOverflow,
                format!("call depth exhausted invoking {}", callee.name),
            );
            return None;
        }
        let out = self.call_resolved_inner(caller, insn, range, target, &callee);
        self.thread.leave_frame();
        out
    }

    fn call_resolved_inner(
        &mut self,
        caller: &Frame,
        insn: InsnRef<'_>,
        range: bool,
        target: MethodId,
        callee: &Method,
    ) -> Option<Value> {
        let (num_regs, num_ins) = match &callee.code {
            Some(code) => (code.registers_size, code.ins_size),
            None => {
                let n = callee.num_arg_registers();
                (n, n)
            }
        };

        let mut callee_frame = Frame::new(target, num_regs, num_ins);
        let first_reg = if range { insn.c_3rc() } else { insn.args_35c()[0] };
        let args35 = if range { [0u16; 5] } else { insn.args_35c() };
        let has_receiver = !callee.is_static();

        let mut cur_reg = num_regs - num_ins;
        if has_receiver {
            callee_frame.set_ref(cur_reg, caller.get_ref(first_reg));
            cur_reg += 1;
        }

        // Wide arguments occupy one logical shorty slot but two caller
        // registers; the second register is always the one after the named
        // one, and two argument positions are consumed.
        let shorty = callee.shorty.as_bytes();
        let mut shorty_pos = 1usize;
        let mut arg_offset = usize::from(has_receiver);
        while cur_reg < num_regs {
            let arg_reg = if range {
                first_reg + arg_offset as u16
            } else {
                args35[arg_offset]
            };
            match shorty.get(shorty_pos) {
                Some(&b'L') => callee_frame.set_ref(cur_reg, caller.get_ref(arg_reg)),
                Some(&b'J') | Some(&b'D') => {
                    callee_frame.set_wide(cur_reg, caller.get_wide(arg_reg));
                    cur_reg += 1;
                    arg_offset += 1;
                }
                _ => callee_frame.set(cur_reg, caller.get(arg_reg)),
            }
            shorty_pos += 1;
            arg_offset += 1;
            cur_reg += 1;
        }

        if !callee.is_native() {
            let code = match &callee.code {
                Some(code) => Arc::clone(code),
                None => {
                    self.throw(
                        ExceptionKind::VirtualMachine,
                        format!("method {} has no body", callee.name),
                    );
                    return None;
                }
            };
            match self.execute(&mut callee_frame, &code, Value::default()) {
                ExecResult::Return(v) => Some(v),
                ExecResult::Unwound => None,
            }
        } else {
            let ins_base = callee_frame.ins_base();
            let (receiver, args_base) = if has_receiver {
                (callee_frame.get_ref(ins_base), ins_base + 1)
            } else {
                (ObjRef::NULL, ins_base)
            };
            let args: Vec<u32> = (args_base..callee_frame.num_regs())
                .map(|r| callee_frame.get(r) as u32)
                .collect();
            if self.env.is_started() {
                self.env.call_native(self.thread, target, receiver, &args)
            } else {
                self.intercept_native(target, receiver, &args)
            }
        }
    }
}
