//! Shared test fixture: a small in-process runtime implementing the
//! interpreter's collaborator seam, plus instruction encoding helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use magpie_interp::dex::{CodeItem, Opcode};
use magpie_interp::{
    access, ClassId, ExceptionKind, Field, FieldId, InvokeKind, Method, MethodId, ObjRef,
    PendingException, PrimKind, Runtime, SuspendController, ThreadContext, Tracer, Value,
};

// ============================================================================
// Instruction encoding helpers
// ============================================================================

pub mod asm {
    use magpie_interp::dex::Opcode;

    pub fn i10x(op: Opcode) -> Vec<u16> {
        vec![op as u8 as u16]
    }

    pub fn i12x(op: Opcode, a: u16, b: u16) -> Vec<u16> {
        vec![op as u8 as u16 | (a & 0xf) << 8 | (b & 0xf) << 12]
    }

    pub fn i11n(op: Opcode, a: u16, lit: i32) -> Vec<u16> {
        vec![op as u8 as u16 | (a & 0xf) << 8 | ((lit as u16) & 0xf) << 12]
    }

    pub fn i11x(op: Opcode, aa: u16) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8]
    }

    pub fn i10t(op: Opcode, offset: i32) -> Vec<u16> {
        vec![op as u8 as u16 | ((offset as i8 as u8) as u16) << 8]
    }

    pub fn i21s(op: Opcode, aa: u16, lit: i32) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8, lit as i16 as u16]
    }

    pub fn i21c(op: Opcode, aa: u16, idx: u16) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8, idx]
    }

    pub fn i21t(op: Opcode, aa: u16, offset: i32) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8, offset as i16 as u16]
    }

    pub fn i22x(op: Opcode, aa: u16, bbbb: u16) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8, bbbb]
    }

    pub fn i23x(op: Opcode, aa: u16, bb: u16, cc: u16) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8, bb & 0xff | cc << 8]
    }

    pub fn i22b(op: Opcode, aa: u16, bb: u16, lit: i32) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8, bb & 0xff | ((lit as i8 as u8) as u16) << 8]
    }

    pub fn i22t(op: Opcode, a: u16, b: u16, offset: i32) -> Vec<u16> {
        vec![
            op as u8 as u16 | (a & 0xf) << 8 | (b & 0xf) << 12,
            offset as i16 as u16,
        ]
    }

    pub fn i22s(op: Opcode, a: u16, b: u16, lit: i32) -> Vec<u16> {
        vec![
            op as u8 as u16 | (a & 0xf) << 8 | (b & 0xf) << 12,
            lit as i16 as u16,
        ]
    }

    pub fn i22c(op: Opcode, a: u16, b: u16, idx: u16) -> Vec<u16> {
        vec![op as u8 as u16 | (a & 0xf) << 8 | (b & 0xf) << 12, idx]
    }

    pub fn i31i(op: Opcode, aa: u16, lit: i32) -> Vec<u16> {
        vec![op as u8 as u16 | aa << 8, lit as u16, (lit as u32 >> 16) as u16]
    }

    pub fn i31t(op: Opcode, aa: u16, offset: i32) -> Vec<u16> {
        vec![
            op as u8 as u16 | aa << 8,
            offset as u16,
            (offset as u32 >> 16) as u16,
        ]
    }

    pub fn i51l(op: Opcode, aa: u16, lit: i64) -> Vec<u16> {
        let bits = lit as u64;
        vec![
            op as u8 as u16 | aa << 8,
            bits as u16,
            (bits >> 16) as u16,
            (bits >> 32) as u16,
            (bits >> 48) as u16,
        ]
    }

    pub fn i35c(op: Opcode, idx: u16, args: &[u16]) -> Vec<u16> {
        assert!(args.len() <= 5);
        let count = args.len() as u16;
        let g = if count == 5 { args[4] & 0xf } else { 0 };
        let mut regs = 0u16;
        for (i, &r) in args.iter().take(4).enumerate() {
            regs |= (r & 0xf) << (i * 4);
        }
        vec![op as u8 as u16 | g << 8 | count << 12, idx, regs]
    }

    pub fn i3rc(op: Opcode, count: u16, idx: u16, first: u16) -> Vec<u16> {
        vec![op as u8 as u16 | count << 8, idx, first]
    }

    /// Concatenates instruction fragments into one stream.
    pub fn code(fragments: &[Vec<u16>]) -> Vec<u16> {
        fragments.concat()
    }
}

// ============================================================================
// Event-recording tracer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Entered(u32),
    Exited(u32),
    Caught(u32, u32),
    Unwound(u32),
    Moved(u32, u32),
}

#[derive(Clone, Default)]
pub struct EventLog(pub Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

pub struct RecordingTracer {
    pub log: EventLog,
    pub positions: bool,
}

impl Tracer for RecordingTracer {
    fn method_entered(&mut self, method: MethodId) {
        self.log.0.lock().unwrap().push(Event::Entered(method.0));
    }

    fn method_exited(&mut self, method: MethodId, _dex_pc: u32, _result: &Value) {
        self.log.0.lock().unwrap().push(Event::Exited(method.0));
    }

    fn position_moved(&mut self, method: MethodId, dex_pc: u32) {
        self.log.0.lock().unwrap().push(Event::Moved(method.0, dex_pc));
    }

    fn exception_caught(&mut self, method: MethodId, handler_pc: u32, _e: &PendingException) {
        self.log
            .0
            .lock()
            .unwrap()
            .push(Event::Caught(method.0, handler_pc));
    }

    fn method_unwound(&mut self, method: MethodId, _dex_pc: u32) {
        self.log.0.lock().unwrap().push(Event::Unwound(method.0));
    }

    fn wants_position_events(&self) -> bool {
        self.positions
    }
}

// ============================================================================
// TestVm: class model, heap, resolver, native registry
// ============================================================================

pub struct ClassDef {
    pub descriptor: String,
    pub super_class: Option<ClassId>,
    pub vtable: Vec<MethodId>,
    /// Set for array classes: element width class.
    pub component: Option<PrimKind>,
    /// Element class for object-array classes.
    pub element_class: Option<ClassId>,
}

pub enum HeapCell {
    Object {
        class: ClassId,
        fields: HashMap<u32, Value>,
    },
    Array {
        class: ClassId,
        kind: PrimKind,
        element_class: Option<ClassId>,
        data: Vec<Value>,
    },
    Str {
        class: ClassId,
        text: String,
    },
    Throwable {
        class: ClassId,
        message: String,
    },
}

pub type NativeFn = fn(&mut TestVm, &mut ThreadContext, ObjRef, &[u32]) -> Option<Value>;

pub struct Builtins {
    pub object: ClassId,
    pub class_mirror: ClassId,
    pub string: ClassId,
    pub throwable: ClassId,
    pub exception: ClassId,
    pub runtime_exception: ClassId,
    pub npe: ClassId,
    pub arithmetic: ClassId,
    pub bounds: ClassId,
    pub negative_size: ClassId,
    pub class_cast: ClassId,
    pub array_store: ClassId,
    pub vm_error: ClassId,
    pub stack_overflow: ClassId,
    pub oom: ClassId,
    pub monitor_state: ClassId,
    pub no_class_def: ClassId,
    pub no_such_method: ClassId,
    pub no_such_field: ClassId,
    pub icce: ClassId,
    pub abstract_method: ClassId,
}

pub struct TestVm {
    pub classes: Vec<ClassDef>,
    pub methods: Vec<Method>,
    pub fields: Vec<Field>,
    pub statics: HashMap<u32, Value>,
    pub heap: Vec<HeapCell>,
    pub method_pool: Vec<MethodId>,
    pub field_pool: Vec<FieldId>,
    pub class_pool: Vec<ClassId>,
    pub string_pool: Vec<String>,
    pub string_objects: HashMap<u32, ObjRef>,
    pub return_classes: HashMap<u32, ClassId>,
    pub interface_impls: HashMap<(u32, u32), MethodId>,
    pub mirrors: HashMap<u32, ObjRef>,
    pub interned: HashMap<String, ObjRef>,
    pub natives: HashMap<u32, NativeFn>,
    pub initialized: Vec<ClassId>,
    pub init_order: Vec<ClassId>,
    pub monitor_ops: Vec<(u32, bool)>,
    pub started: bool,
    pub builtins: Builtins,
}

impl TestVm {
    pub fn new() -> TestVm {
        let mut classes = Vec::new();
        let mut add = |descriptor: &str, super_class: Option<ClassId>| {
            classes.push(ClassDef {
                descriptor: descriptor.to_string(),
                super_class,
                vtable: Vec::new(),
                component: None,
                element_class: None,
            });
            ClassId(classes.len() as u32 - 1)
        };
        let object = add("Ljava/lang/Object;", None);
        let class_mirror = add("Ljava/lang/Class;", Some(object));
        let string = add("Ljava/lang/String;", Some(object));
        let throwable = add("Ljava/lang/Throwable;", Some(object));
        let exception = add("Ljava/lang/Exception;", Some(throwable));
        let runtime_exception = add("Ljava/lang/RuntimeException;", Some(exception));
        let npe = add("Ljava/lang/NullPointerException;", Some(runtime_exception));
        let arithmetic = add("Ljava/lang/ArithmeticException;", Some(runtime_exception));
        let bounds = add(
            "Ljava/lang/ArrayIndexOutOfBoundsException;",
            Some(runtime_exception),
        );
        let negative_size = add(
            "Ljava/lang/NegativeArraySizeException;",
            Some(runtime_exception),
        );
        let class_cast = add("Ljava/lang/ClassCastException;", Some(runtime_exception));
        let array_store = add("Ljava/lang/ArrayStoreException;", Some(runtime_exception));
        let vm_error = add("Ljava/lang/VirtualMachineError;", Some(throwable));
        let stack_overflow = add("Ljava/lang/StackOverflowError;", Some(vm_error));
        let oom = add("Ljava/lang/OutOfMemoryError;", Some(vm_error));
        let monitor_state = add(
            "Ljava/lang/IllegalMonitorStateException;",
            Some(runtime_exception),
        );
        let no_class_def = add("Ljava/lang/NoClassDefFoundError;", Some(throwable));
        let no_such_method = add("Ljava/lang/NoSuchMethodError;", Some(throwable));
        let no_such_field = add("Ljava/lang/NoSuchFieldError;", Some(throwable));
        let icce = add("Ljava/lang/IncompatibleClassChangeError;", Some(throwable));
        let abstract_method = add("Ljava/lang/AbstractMethodError;", Some(icce));

        TestVm {
            classes,
            methods: Vec::new(),
            fields: Vec::new(),
            statics: HashMap::new(),
            heap: Vec::new(),
            method_pool: Vec::new(),
            field_pool: Vec::new(),
            class_pool: Vec::new(),
            string_pool: Vec::new(),
            string_objects: HashMap::new(),
            return_classes: HashMap::new(),
            interface_impls: HashMap::new(),
            mirrors: HashMap::new(),
            interned: HashMap::new(),
            natives: HashMap::new(),
            initialized: Vec::new(),
            init_order: Vec::new(),
            monitor_ops: Vec::new(),
            started: true,
            builtins: Builtins {
                object,
                class_mirror,
                string,
                throwable,
                exception,
                runtime_exception,
                npe,
                arithmetic,
                bounds,
                negative_size,
                class_cast,
                array_store,
                vm_error,
                stack_overflow,
                oom,
                monitor_state,
                no_class_def,
                no_such_method,
                no_such_field,
                icce,
                abstract_method,
            },
        }
    }

    // ---- model construction ----

    pub fn add_class(&mut self, descriptor: &str, super_class: Option<ClassId>) -> ClassId {
        self.classes.push(ClassDef {
            descriptor: descriptor.to_string(),
            super_class,
            vtable: Vec::new(),
            component: None,
            element_class: None,
        });
        ClassId(self.classes.len() as u32 - 1)
    }

    pub fn add_array_class(
        &mut self,
        descriptor: &str,
        component: PrimKind,
        element_class: Option<ClassId>,
    ) -> ClassId {
        let object = self.builtins.object;
        let id = self.add_class(descriptor, Some(object));
        self.classes[id.0 as usize].component = Some(component);
        self.classes[id.0 as usize].element_class = element_class;
        id
    }

    pub fn add_method(
        &mut self,
        class: ClassId,
        name: &str,
        shorty: &str,
        access_flags: u32,
        code: Option<CodeItem>,
        vtable_index: Option<u16>,
    ) -> MethodId {
        self.methods.push(Method {
            declaring_class: class,
            name: name.to_string(),
            shorty: shorty.to_string(),
            access_flags,
            code: code.map(Arc::new),
            vtable_index,
        });
        let id = MethodId(self.methods.len() as u32 - 1);
        if let Some(idx) = vtable_index {
            let vtable = &mut self.classes[class.0 as usize].vtable;
            if vtable.len() <= idx as usize {
                vtable.resize(idx as usize + 1, id);
            }
            vtable[idx as usize] = id;
        }
        id
    }

    pub fn set_code(&mut self, method: MethodId, code: CodeItem) {
        self.methods[method.0 as usize].code = Some(Arc::new(code));
    }

    pub fn add_field(
        &mut self,
        class: ClassId,
        name: &str,
        kind: PrimKind,
        field_class: Option<ClassId>,
        is_static: bool,
        is_volatile: bool,
        offset: u32,
    ) -> FieldId {
        self.fields.push(Field {
            declaring_class: class,
            name: name.to_string(),
            kind,
            class: field_class,
            is_static,
            is_volatile,
            offset,
        });
        FieldId(self.fields.len() as u32 - 1)
    }

    /// Registers a method in the constant pool, returning its index.
    pub fn pool_method(&mut self, method: MethodId) -> u16 {
        self.method_pool.push(method);
        self.method_pool.len() as u16 - 1
    }

    pub fn pool_field(&mut self, field: FieldId) -> u16 {
        self.field_pool.push(field);
        self.field_pool.len() as u16 - 1
    }

    pub fn pool_class(&mut self, class: ClassId) -> u16 {
        self.class_pool.push(class);
        self.class_pool.len() as u16 - 1
    }

    pub fn pool_string(&mut self, text: &str) -> u32 {
        self.string_pool.push(text.to_string());
        self.string_pool.len() as u32 - 1
    }

    // ---- heap helpers ----

    fn push_cell(&mut self, cell: HeapCell) -> ObjRef {
        self.heap.push(cell);
        ObjRef::from_raw(self.heap.len() as u32)
    }

    fn cell(&self, r: ObjRef) -> &HeapCell {
        &self.heap[r.raw() as usize - 1]
    }

    fn cell_mut(&mut self, r: ObjRef) -> &mut HeapCell {
        &mut self.heap[r.raw() as usize - 1]
    }

    pub fn new_object(&mut self, class: ClassId) -> ObjRef {
        self.push_cell(HeapCell::Object {
            class,
            fields: HashMap::new(),
        })
    }

    pub fn new_string(&mut self, text: &str) -> ObjRef {
        let class = self.builtins.string;
        self.push_cell(HeapCell::Str {
            class,
            text: text.to_string(),
        })
    }

    pub fn new_array(&mut self, class: ClassId, length: usize) -> ObjRef {
        let kind = self.classes[class.0 as usize]
            .component
            .expect("not an array class");
        let element_class = self.classes[class.0 as usize].element_class;
        let fill = match kind {
            PrimKind::Object => Value::from_ref(ObjRef::NULL),
            _ => Value::default(),
        };
        self.push_cell(HeapCell::Array {
            class,
            kind,
            element_class,
            data: vec![fill; length],
        })
    }

    pub fn raise(
        &mut self,
        thread: &mut ThreadContext,
        kind: ExceptionKind,
        message: impl Into<String>,
    ) {
        let class = self.exception_class(kind);
        let message = message.into();
        let object = self.alloc_throwable(thread, class, &message);
        let descriptor = self.class_descriptor(class).to_string();
        thread.set_pending(PendingException {
            class,
            object,
            message: Some(message),
            descriptor,
        });
    }
}

impl Default for TestVm {
    fn default() -> Self {
        TestVm::new()
    }
}

impl Runtime for TestVm {
    fn method(&self, method: MethodId) -> &Method {
        &self.methods[method.0 as usize]
    }

    fn field(&self, field: FieldId) -> &Field {
        &self.fields[field.0 as usize]
    }

    fn class_descriptor(&self, class: ClassId) -> &str {
        &self.classes[class.0 as usize].descriptor
    }

    fn resolve_method(
        &mut self,
        thread: &mut ThreadContext,
        _referrer: MethodId,
        method_idx: u16,
        kind: InvokeKind,
        _access_check: bool,
    ) -> Option<MethodId> {
        let id = match self.method_pool.get(method_idx as usize) {
            Some(&m) => m,
            None => {
                self.raise(
                    thread,
                    ExceptionKind::NoSuchMethod,
                    format!("unresolved method index {}", method_idx),
                );
                return None;
            }
        };
        if kind == InvokeKind::Static {
            let declaring = self.methods[id.0 as usize].declaring_class;
            if !self.ensure_initialized(thread, declaring) {
                return None;
            }
        }
        Some(id)
    }

    fn resolve_field(
        &mut self,
        thread: &mut ThreadContext,
        _referrer: MethodId,
        field_idx: u16,
        is_static: bool,
        _is_put: bool,
        expected: PrimKind,
        access_check: bool,
    ) -> Option<FieldId> {
        let id = match self.field_pool.get(field_idx as usize) {
            Some(&f) => f,
            None => {
                self.raise(
                    thread,
                    ExceptionKind::NoSuchField,
                    format!("unresolved field index {}", field_idx),
                );
                return None;
            }
        };
        let (actual_static, actual_kind, declaring) = {
            let f = &self.fields[id.0 as usize];
            (f.is_static, f.kind, f.declaring_class)
        };
        if access_check {
            if actual_static != is_static {
                self.raise(
                    thread,
                    ExceptionKind::IncompatibleClassChange,
                    "field staticness does not match the access",
                );
                return None;
            }
            if actual_kind != expected {
                self.raise(
                    thread,
                    ExceptionKind::NoSuchField,
                    "field width does not match the access",
                );
                return None;
            }
        }
        if is_static && !self.ensure_initialized(thread, declaring) {
            return None;
        }
        Some(id)
    }

    fn resolve_class(
        &mut self,
        thread: &mut ThreadContext,
        _referrer: MethodId,
        type_idx: u16,
        _access_check: bool,
    ) -> Option<ClassId> {
        match self.class_pool.get(type_idx as usize) {
            Some(&c) => Some(c),
            None => {
                self.raise(
                    thread,
                    ExceptionKind::NoClassDefFound,
                    format!("unresolved type index {}", type_idx),
                );
                None
            }
        }
    }

    fn lookup_resolved_class(&self, _referrer: MethodId, type_idx: u16) -> Option<ClassId> {
        self.class_pool.get(type_idx as usize).copied()
    }

    fn resolve_return_class(
        &mut self,
        _thread: &mut ThreadContext,
        referrer: MethodId,
    ) -> Option<ClassId> {
        Some(
            self.return_classes
                .get(&referrer.0)
                .copied()
                .unwrap_or(self.builtins.object),
        )
    }

    fn resolve_string(
        &mut self,
        thread: &mut ThreadContext,
        _referrer: MethodId,
        string_idx: u32,
    ) -> Option<ObjRef> {
        if let Some(&existing) = self.string_objects.get(&string_idx) {
            return Some(existing);
        }
        let text = match self.string_pool.get(string_idx as usize) {
            Some(t) => t.clone(),
            None => {
                self.raise(
                    thread,
                    ExceptionKind::VirtualMachine,
                    format!("unresolved string index {}", string_idx),
                );
                return None;
            }
        };
        let obj = self.new_string(&text);
        self.string_objects.insert(string_idx, obj);
        Some(obj)
    }

    fn ensure_initialized(&mut self, _thread: &mut ThreadContext, class: ClassId) -> bool {
        if !self.initialized.contains(&class) {
            self.initialized.push(class);
            self.init_order.push(class);
        }
        true
    }

    fn object_class(&self, obj: ObjRef) -> ClassId {
        match self.cell(obj) {
            HeapCell::Object { class, .. } => *class,
            HeapCell::Array { class, .. } => *class,
            HeapCell::Str { class, .. } => *class,
            HeapCell::Throwable { class, .. } => *class,
        }
    }

    fn is_assignable(&self, target: ClassId, source: ClassId) -> bool {
        let mut current = Some(source);
        while let Some(c) = current {
            if c == target {
                return true;
            }
            current = self.classes[c.0 as usize].super_class;
        }
        false
    }

    fn throwable_class(&self) -> ClassId {
        self.builtins.throwable
    }

    fn exception_class(&self, kind: ExceptionKind) -> ClassId {
        let b = &self.builtins;
        match kind {
            ExceptionKind::NoClassDefFound => b.no_class_def,
            ExceptionKind::NoSuchMethod => b.no_such_method,
            ExceptionKind::NoSuchField => b.no_such_field,
            ExceptionKind::IncompatibleClassChange => b.icce,
            ExceptionKind::AbstractMethod => b.abstract_method,
            ExceptionKind::NullPointer => b.npe,
            ExceptionKind::Arithmetic => b.arithmetic,
            ExceptionKind::ArrayIndexOutOfBounds => b.bounds,
            ExceptionKind::NegativeArraySize => b.negative_size,
            ExceptionKind::ClassCast => b.class_cast,
            ExceptionKind::ArrayStore => b.array_store,
            ExceptionKind::VirtualMachine => b.vm_error,
            ExceptionKind::StackOverflow => b.stack_overflow,
            ExceptionKind::OutOfMemory => b.oom,
            ExceptionKind::IllegalMonitorState => b.monitor_state,
        }
    }

    fn throwable_message(&self, obj: ObjRef) -> Option<String> {
        match self.cell(obj) {
            HeapCell::Throwable { message, .. } => Some(message.clone()),
            _ => None,
        }
    }

    fn vtable_entry(&self, class: ClassId, index: u16) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(c) = current {
            let def = &self.classes[c.0 as usize];
            if let Some(&m) = def.vtable.get(index as usize) {
                return Some(m);
            }
            current = def.super_class;
        }
        None
    }

    fn interface_target(&self, receiver_class: ClassId, method: MethodId) -> Option<MethodId> {
        self.interface_impls
            .get(&(receiver_class.0, method.0))
            .copied()
    }

    fn super_class(&self, class: ClassId) -> Option<ClassId> {
        self.classes[class.0 as usize].super_class
    }

    fn alloc_object(&mut self, _thread: &mut ThreadContext, class: ClassId) -> Option<ObjRef> {
        Some(self.new_object(class))
    }

    fn alloc_array(
        &mut self,
        thread: &mut ThreadContext,
        array_class: ClassId,
        length: i32,
    ) -> Option<ObjRef> {
        if length < 0 {
            self.raise(
                thread,
                ExceptionKind::NegativeArraySize,
                format!("{}", length),
            );
            return None;
        }
        Some(self.new_array(array_class, length as usize))
    }

    fn alloc_throwable(
        &mut self,
        _thread: &mut ThreadContext,
        class: ClassId,
        message: &str,
    ) -> ObjRef {
        self.push_cell(HeapCell::Throwable {
            class,
            message: message.to_string(),
        })
    }

    fn array_length(&self, array: ObjRef) -> i32 {
        match self.cell(array) {
            HeapCell::Array { data, .. } => data.len() as i32,
            _ => 0,
        }
    }

    fn array_element_class(&self, array: ObjRef) -> Option<ClassId> {
        match self.cell(array) {
            HeapCell::Array { element_class, .. } => *element_class,
            _ => None,
        }
    }

    fn array_element_kind(&self, array: ObjRef) -> PrimKind {
        match self.cell(array) {
            HeapCell::Array { kind, .. } => *kind,
            _ => PrimKind::Int,
        }
    }

    fn array_component_kind(&self, class: ClassId) -> Option<PrimKind> {
        self.classes[class.0 as usize].component
    }

    fn array_get(&self, array: ObjRef, index: i32) -> Value {
        match self.cell(array) {
            HeapCell::Array { data, .. } => data[index as usize],
            _ => Value::default(),
        }
    }

    fn array_put(&mut self, array: ObjRef, index: i32, value: Value) {
        if let HeapCell::Array { data, .. } = self.cell_mut(array) {
            data[index as usize] = value;
        }
    }

    fn get_static(&self, field: FieldId) -> Value {
        self.statics.get(&field.0).copied().unwrap_or_default()
    }

    fn set_static(&mut self, field: FieldId, value: Value) {
        self.statics.insert(field.0, value);
    }

    fn get_instance(&self, obj: ObjRef, field: FieldId) -> Value {
        let offset = self.fields[field.0 as usize].offset;
        self.get_instance_at(obj, offset, self.fields[field.0 as usize].kind)
    }

    fn set_instance(&mut self, obj: ObjRef, field: FieldId, value: Value) {
        let offset = self.fields[field.0 as usize].offset;
        let kind = self.fields[field.0 as usize].kind;
        self.set_instance_at(obj, offset, kind, value);
    }

    fn get_instance_at(&self, obj: ObjRef, offset: u32, _kind: PrimKind) -> Value {
        match self.cell(obj) {
            HeapCell::Object { fields, .. } => fields.get(&offset).copied().unwrap_or_default(),
            _ => Value::default(),
        }
    }

    fn set_instance_at(&mut self, obj: ObjRef, offset: u32, _kind: PrimKind, value: Value) {
        if let HeapCell::Object { fields, .. } = self.cell_mut(obj) {
            fields.insert(offset, value);
        }
    }

    fn class_mirror(&mut self, class: ClassId) -> ObjRef {
        if let Some(&m) = self.mirrors.get(&class.0) {
            return m;
        }
        let mirror_class = self.builtins.class_mirror;
        let obj = self.new_object(mirror_class);
        self.mirrors.insert(class.0, obj);
        obj
    }

    fn find_class(&mut self, thread: &mut ThreadContext, descriptor: &str) -> Option<ClassId> {
        match self
            .classes
            .iter()
            .position(|c| c.descriptor == descriptor)
        {
            Some(i) => Some(ClassId(i as u32)),
            None => {
                self.raise(
                    thread,
                    ExceptionKind::NoClassDefFound,
                    descriptor.to_string(),
                );
                None
            }
        }
    }

    fn intern_string(&mut self, _thread: &mut ThreadContext, s: ObjRef) -> ObjRef {
        let text = match self.cell(s) {
            HeapCell::Str { text, .. } => text.clone(),
            _ => return s,
        };
        if let Some(&existing) = self.interned.get(&text) {
            return existing;
        }
        self.interned.insert(text, s);
        s
    }

    fn string_text(&self, s: ObjRef) -> Option<String> {
        match self.cell(s) {
            HeapCell::Str { text, .. } => Some(text.clone()),
            _ => None,
        }
    }

    fn monitor_enter(&mut self, _thread: &mut ThreadContext, obj: ObjRef) -> bool {
        self.monitor_ops.push((obj.raw(), true));
        true
    }

    fn monitor_exit(&mut self, _thread: &mut ThreadContext, obj: ObjRef) -> bool {
        self.monitor_ops.push((obj.raw(), false));
        true
    }

    fn call_native(
        &mut self,
        thread: &mut ThreadContext,
        method: MethodId,
        receiver: ObjRef,
        args: &[u32],
    ) -> Option<Value> {
        let native = self.natives.get(&method.0).copied();
        match native {
            Some(f) => f(self, thread, receiver, args),
            None => {
                self.raise(
                    thread,
                    ExceptionKind::VirtualMachine,
                    format!("no native registered for method {}", method.0),
                );
                None
            }
        }
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

// ============================================================================
// Convenience entry points for tests
// ============================================================================

pub fn test_thread() -> ThreadContext {
    let _ = env_logger::builder().is_test(true).try_init();
    ThreadContext::new(Arc::new(SuspendController::new()))
}

pub fn traced_thread(log: &EventLog) -> ThreadContext {
    ThreadContext::new(Arc::new(SuspendController::new())).with_tracer(Box::new(
        RecordingTracer {
            log: log.clone(),
            positions: false,
        },
    ))
}

/// A plain static int method: all-purpose harness for arithmetic tests.
pub fn static_method(
    vm: &mut TestVm,
    name: &str,
    shorty: &str,
    registers: u16,
    ins: u16,
    insns: Vec<u16>,
) -> MethodId {
    static_method_with_tries(vm, name, shorty, registers, ins, insns, Vec::new())
}

pub fn static_method_with_tries(
    vm: &mut TestVm,
    name: &str,
    shorty: &str,
    registers: u16,
    ins: u16,
    insns: Vec<u16>,
    tries: Vec<magpie_interp::dex::TryItem>,
) -> MethodId {
    let class = vm.builtins.object;
    vm.add_method(
        class,
        name,
        shorty,
        access::STATIC,
        Some(CodeItem {
            registers_size: registers,
            ins_size: ins,
            insns,
            tries,
        }),
        None,
    )
}

/// Suppresses unused-import warnings for Opcode re-exported to test files.
pub fn _opcode_witness() -> Opcode {
    Opcode::Nop
}
