use super::*;
use num_bigint::BigInt;

/// Native implementations are written against `JsResult` and adapted to the
/// [`NativeFn`] calling convention when installed.
type NativeImpl = fn(&mut Interpreter, &JsValue, &[JsValue]) -> JsResult<JsValue>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    Type,
    Range,
    Reference,
    Syntax,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::Type,
        ErrorKind::Range,
        ErrorKind::Reference,
        ErrorKind::Syntax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Type => "TypeError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
        }
    }
}

/// The well-known objects every realm starts with.
pub(crate) struct Intrinsics {
    pub(crate) object_prototype: JsObject,
    pub(crate) function_prototype: JsObject,
    pub(crate) array_prototype: JsObject,
    pub(crate) string_prototype: JsObject,
    pub(crate) number_prototype: JsObject,
    pub(crate) boolean_prototype: JsObject,
    pub(crate) symbol_prototype: JsObject,
    pub(crate) bigint_prototype: JsObject,
    pub(crate) iterator_prototype: JsObject,
    pub(crate) array_iterator_prototype: JsObject,
    pub(crate) error_prototype: JsObject,
    pub(crate) type_error_prototype: JsObject,
    pub(crate) range_error_prototype: JsObject,
    pub(crate) reference_error_prototype: JsObject,
    pub(crate) syntax_error_prototype: JsObject,
    pub(crate) global_object: JsObject,
    /// `%Array.prototype.values%`, shared with arguments objects.
    pub(crate) array_values: JsValue,
    pub(crate) symbol_has_instance: JsSymbol,
    pub(crate) symbol_iterator: JsSymbol,
    pub(crate) symbol_to_primitive: JsSymbol,
    pub(crate) symbol_to_string_tag: JsSymbol,
}

fn allocate_with_proto(heap: &mut Heap, proto: &JsObject, kind: ObjectKind) -> JsObject {
    let mut data = JsObjectData::new(Some(heap.get(proto)));
    data.kind = kind;
    heap.allocate(data)
}

fn well_known(next_symbol_id: &mut u64, which: WellKnownSymbol) -> JsSymbol {
    let id = *next_symbol_id;
    *next_symbol_id += 1;
    JsSymbol {
        id,
        description: Some(JsString::from_str(&which.description())),
    }
}

impl Intrinsics {
    /// Allocates the bare intrinsic objects. Their properties are installed
    /// later by [`Interpreter::setup_globals`].
    pub(crate) fn allocate(heap: &mut Heap, next_symbol_id: &mut u64) -> Self {
        let object_prototype = heap.allocate(JsObjectData::new(None));
        let mut function_data = JsObjectData::new(Some(heap.get(&object_prototype)));
        function_data.callable = Some(JsFunction::native("", 0, |_, _, _| {
            Completion::Normal(JsValue::Undefined)
        }));
        let function_prototype = heap.allocate(function_data);
        let ordinary = |heap: &mut Heap| allocate_with_proto(heap, &object_prototype, ObjectKind::Ordinary);

        let array_prototype =
            allocate_with_proto(heap, &object_prototype, ObjectKind::Array(ArrayElements::default()));
        let string_prototype = allocate_with_proto(
            heap,
            &object_prototype,
            ObjectKind::PrimitiveWrapper(JsValue::from("")),
        );
        let number_prototype = allocate_with_proto(
            heap,
            &object_prototype,
            ObjectKind::PrimitiveWrapper(JsValue::Number(0.0)),
        );
        let boolean_prototype = allocate_with_proto(
            heap,
            &object_prototype,
            ObjectKind::PrimitiveWrapper(JsValue::Boolean(false)),
        );
        let symbol_prototype = ordinary(heap);
        let bigint_prototype = ordinary(heap);
        let iterator_prototype = ordinary(heap);
        let array_iterator_prototype =
            allocate_with_proto(heap, &iterator_prototype, ObjectKind::Ordinary);
        let error_prototype = ordinary(heap);
        let sub_error = |heap: &mut Heap| allocate_with_proto(heap, &error_prototype, ObjectKind::Ordinary);
        let type_error_prototype = sub_error(heap);
        let range_error_prototype = sub_error(heap);
        let reference_error_prototype = sub_error(heap);
        let syntax_error_prototype = sub_error(heap);
        let global_object = ordinary(heap);

        Self {
            object_prototype,
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            symbol_prototype,
            bigint_prototype,
            iterator_prototype,
            array_iterator_prototype,
            error_prototype,
            type_error_prototype,
            range_error_prototype,
            reference_error_prototype,
            syntax_error_prototype,
            global_object,
            array_values: JsValue::Undefined,
            symbol_has_instance: well_known(next_symbol_id, WellKnownSymbol::HasInstance),
            symbol_iterator: well_known(next_symbol_id, WellKnownSymbol::Iterator),
            symbol_to_primitive: well_known(next_symbol_id, WellKnownSymbol::ToPrimitive),
            symbol_to_string_tag: well_known(next_symbol_id, WellKnownSymbol::ToStringTag),
        }
    }

    pub(crate) fn error_prototype(&self, kind: ErrorKind) -> JsObject {
        match kind {
            ErrorKind::Error => self.error_prototype,
            ErrorKind::Type => self.type_error_prototype,
            ErrorKind::Range => self.range_error_prototype,
            ErrorKind::Reference => self.reference_error_prototype,
            ErrorKind::Syntax => self.syntax_error_prototype,
        }
    }
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

impl Interpreter {
    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> JsValue {
        let proto = self.intrinsics.error_prototype(kind);
        let err = self.create_object_of_kind(&proto, ObjectKind::Error);
        self.get_object(&err)
            .borrow_mut()
            .insert_builtin("message".into_property_key(), JsValue::from(message));
        JsValue::Object(err)
    }

    pub fn create_type_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Type, message)
    }

    pub fn create_range_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Range, message)
    }

    pub fn create_reference_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Reference, message)
    }

    pub fn create_syntax_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Syntax, message)
    }

    fn builtin_function(&mut self, name: &str, arity: usize, f: NativeImpl) -> JsValue {
        self.create_native_function(name, arity, move |interp, this, args| {
            f(interp, this, args).into()
        })
    }

    fn define_method(&mut self, target: &JsObject, name: &str, arity: usize, f: NativeImpl) -> JsValue {
        let func = self.builtin_function(name, arity, f);
        self.get_object(target)
            .borrow_mut()
            .insert_builtin(name.into_property_key(), func.clone());
        func
    }

    fn define_symbol_method(
        &mut self,
        target: &JsObject,
        symbol: JsSymbol,
        arity: usize,
        f: NativeImpl,
    ) -> JsValue {
        let name = format!("[{}]", symbol.description.clone().unwrap_or_default());
        let func = self.builtin_function(&name, arity, f);
        self.get_object(target)
            .borrow_mut()
            .insert_builtin(symbol.into_property_key(), func.clone());
        func
    }

    fn define_getter(&mut self, target: &JsObject, name: &str, f: NativeImpl) {
        let getter = self.builtin_function(&format!("get {name}"), 0, f);
        self.get_object(target).borrow_mut().insert_property(
            name.into_property_key(),
            PropertyDescriptor::accessor(Some(getter), None, false, true),
        );
    }

    fn define_constant(&mut self, target: &JsObject, key: impl PropertyKeyLike, value: JsValue) {
        self.get_object(target).borrow_mut().insert_property(
            key.into_property_key(),
            PropertyDescriptor::data(value, false, false, false),
        );
    }

    /// Installs a global constructor and links it with its prototype object.
    fn define_constructor(
        &mut self,
        name: &str,
        arity: usize,
        f: NativeImpl,
        prototype: JsObject,
        constructor: bool,
    ) -> JsObject {
        let wrapped = move |interp: &mut Interpreter, this: &JsValue, args: &[JsValue]| -> Completion {
            f(interp, this, args).into()
        };
        let func = if constructor {
            JsFunction::native_constructor(name, arity, wrapped)
        } else {
            JsFunction::native(name, arity, wrapped)
        };
        let ctor = self.create_function(func);
        let JsValue::Object(ctor_obj) = ctor else {
            unreachable!("create_function always returns an object");
        };
        self.define_constant(&ctor_obj, "prototype", JsValue::Object(prototype));
        self.get_object(&prototype)
            .borrow_mut()
            .insert_builtin("constructor".into_property_key(), ctor.clone());
        let global = self.intrinsics.global_object;
        self.get_object(&global)
            .borrow_mut()
            .insert_builtin(name.into_property_key(), ctor);
        ctor_obj
    }

    pub(crate) fn setup_globals(&mut self) {
        let global = self.intrinsics.global_object;
        {
            let g = self.get_object(&global);
            let mut g = g.borrow_mut();
            g.insert_builtin("globalThis".into_property_key(), JsValue::Object(global));
            for (name, value) in [
                ("undefined", JsValue::Undefined),
                ("NaN", JsValue::Number(f64::NAN)),
                ("Infinity", JsValue::Number(f64::INFINITY)),
            ] {
                g.insert_property(
                    name.into_property_key(),
                    PropertyDescriptor::data(value, false, false, false),
                );
            }
        }
        self.setup_object();
        self.setup_function();
        self.setup_array();
        self.setup_iterators();
        self.setup_primitive_wrappers();
        self.setup_symbol();
        self.setup_bigint();
        self.setup_errors();
    }

    fn setup_object(&mut self) {
        let proto = self.intrinsics.object_prototype;
        let ctor = self.define_constructor("Object", 1, object_constructor, proto, true);
        self.define_method(&ctor, "getPrototypeOf", 1, object_get_prototype_of);
        self.define_method(&ctor, "setPrototypeOf", 2, object_set_prototype_of);
        self.define_method(&ctor, "create", 1, object_create);
        self.define_method(&ctor, "defineProperty", 3, object_define_property);
        self.define_method(&ctor, "getOwnPropertyDescriptor", 2, object_get_own_property_descriptor);
        self.define_method(&ctor, "keys", 1, object_keys);
        self.define_method(&proto, "toString", 0, object_to_string);
        self.define_method(&proto, "valueOf", 0, object_value_of);
        self.define_method(&proto, "hasOwnProperty", 1, object_has_own_property);
    }

    fn setup_function(&mut self) {
        let proto = self.intrinsics.function_prototype;
        {
            let p = self.get_object(&proto);
            let mut p = p.borrow_mut();
            p.insert_property(
                "length".into_property_key(),
                PropertyDescriptor::data(JsValue::Number(0.0), false, false, true),
            );
            p.insert_property(
                "name".into_property_key(),
                PropertyDescriptor::data(JsValue::from(""), false, false, true),
            );
        }
        self.define_method(&proto, "call", 1, function_call);
        self.define_method(&proto, "apply", 2, function_apply);
        self.define_method(&proto, "toString", 0, function_to_string);
        let has_instance = self.intrinsics.symbol_has_instance.clone();
        let f = self.builtin_function("[Symbol.hasInstance]", 1, function_has_instance);
        self.define_constant(&proto, has_instance, f);
    }

    fn setup_array(&mut self) {
        let proto = self.intrinsics.array_prototype;
        let ctor = self.define_constructor("Array", 1, array_constructor, proto, true);
        self.define_method(&ctor, "isArray", 1, array_is_array);
        self.define_method(&proto, "join", 1, array_join);
        self.define_method(&proto, "toString", 0, array_to_string);
        self.define_method(&proto, "push", 1, array_push);
        let values = self.define_method(&proto, "values", 0, array_values);
        let iterator = self.intrinsics.symbol_iterator.clone();
        self.get_object(&proto)
            .borrow_mut()
            .insert_builtin(iterator.into_property_key(), values.clone());
        self.intrinsics.array_values = values;
    }

    fn setup_iterators(&mut self) {
        let iterator_proto = self.intrinsics.iterator_prototype;
        let iterator = self.intrinsics.symbol_iterator.clone();
        self.define_symbol_method(&iterator_proto, iterator, 0, |_, this, _| Ok(this.clone()));

        let array_iter_proto = self.intrinsics.array_iterator_prototype;
        self.define_method(&array_iter_proto, "next", 0, array_iterator_next);
        let tag = self.intrinsics.symbol_to_string_tag.clone();
        self.get_object(&array_iter_proto).borrow_mut().insert_property(
            tag.into_property_key(),
            PropertyDescriptor::data(JsValue::from("Array Iterator"), false, false, true),
        );
    }

    fn setup_primitive_wrappers(&mut self) {
        let proto = self.intrinsics.string_prototype;
        self.define_constructor("String", 1, string_constructor, proto, true);
        self.define_method(&proto, "toString", 0, string_value_of);
        self.define_method(&proto, "valueOf", 0, string_value_of);

        let proto = self.intrinsics.number_prototype;
        self.define_constructor("Number", 1, number_constructor, proto, true);
        self.define_method(&proto, "toString", 1, number_to_string);
        self.define_method(&proto, "valueOf", 0, number_value_of);

        let proto = self.intrinsics.boolean_prototype;
        self.define_constructor("Boolean", 1, boolean_constructor, proto, true);
        self.define_method(&proto, "toString", 0, boolean_to_string);
        self.define_method(&proto, "valueOf", 0, boolean_value_of);
    }

    fn setup_symbol(&mut self) {
        let proto = self.intrinsics.symbol_prototype;
        let ctor = self.define_constructor("Symbol", 0, symbol_constructor, proto, false);
        for which in WellKnownSymbol::ALL {
            let sym = self.well_known_symbol(which);
            self.define_constant(&ctor, which.property_name(), JsValue::Symbol(sym));
        }
        self.define_method(&proto, "toString", 0, symbol_to_string);
        self.define_method(&proto, "valueOf", 0, symbol_value_of);
        self.define_getter(&proto, "description", symbol_description);
        let tag = self.intrinsics.symbol_to_string_tag.clone();
        self.get_object(&proto).borrow_mut().insert_property(
            tag.into_property_key(),
            PropertyDescriptor::data(JsValue::from("Symbol"), false, false, true),
        );
    }

    fn setup_bigint(&mut self) {
        let proto = self.intrinsics.bigint_prototype;
        self.define_constructor("BigInt", 1, bigint_constructor, proto, false);
        self.define_method(&proto, "toString", 0, bigint_to_string);
        self.define_method(&proto, "valueOf", 0, bigint_value_of);
        let tag = self.intrinsics.symbol_to_string_tag.clone();
        self.get_object(&proto).borrow_mut().insert_property(
            tag.into_property_key(),
            PropertyDescriptor::data(JsValue::from("BigInt"), false, false, true),
        );
    }

    fn setup_errors(&mut self) {
        let mut base_ctor = None;
        for kind in ErrorKind::ALL {
            let proto = self.intrinsics.error_prototype(kind);
            let f: NativeImpl = match kind {
                ErrorKind::Error => |i, t, a| error_constructor(i, t, a, ErrorKind::Error),
                ErrorKind::Type => |i, t, a| error_constructor(i, t, a, ErrorKind::Type),
                ErrorKind::Range => |i, t, a| error_constructor(i, t, a, ErrorKind::Range),
                ErrorKind::Reference => |i, t, a| error_constructor(i, t, a, ErrorKind::Reference),
                ErrorKind::Syntax => |i, t, a| error_constructor(i, t, a, ErrorKind::Syntax),
            };
            let ctor = self.define_constructor(kind.name(), 1, f, proto, true);
            {
                let p = self.get_object(&proto);
                let mut p = p.borrow_mut();
                p.insert_builtin("name".into_property_key(), JsValue::from(kind.name()));
                p.insert_builtin("message".into_property_key(), JsValue::from(""));
            }
            match base_ctor {
                None => {
                    self.define_method(&proto, "toString", 0, error_to_string);
                    base_ctor = Some(ctor);
                }
                Some(base) => {
                    let base_rc = self.get_object(&base);
                    self.get_object(&ctor).borrow_mut().prototype = Some(base_rc);
                }
            }
        }
    }
}

// Object

fn object_constructor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let value = arg(args, 0);
    if value.is_nullish() {
        return Ok(match (&interp.new_target, this) {
            (Some(_), JsValue::Object(_)) => this.clone(),
            _ => JsValue::Object(interp.create_object()),
        });
    }
    Ok(JsValue::Object(interp.to_object(&value)?))
}

fn object_get_prototype_of(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let obj = interp.to_object(&arg(args, 0))?;
    Ok(interp
        .get_prototype_of(&obj)
        .map_or(JsValue::Null, JsValue::Object))
}

fn object_set_prototype_of(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let proto = arg(args, 1);
    if target.is_nullish() {
        return Err(interp.create_type_error("Object.setPrototypeOf called on null or undefined"));
    }
    let proto = match proto {
        JsValue::Object(p) => Some(p),
        JsValue::Null => None,
        other => {
            return Err(interp.create_type_error(&format!(
                "Object prototype may only be an Object or null: {other}"
            )));
        }
    };
    let JsValue::Object(obj) = target else {
        return Ok(target);
    };
    if !interp.set_prototype_of(&obj, proto.as_ref()) {
        return Err(interp.create_type_error("Cyclic __proto__ value"));
    }
    Ok(target)
}

fn object_create(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match arg(args, 0) {
        JsValue::Object(p) => Ok(JsValue::Object(interp.create_object_with_proto(Some(&p)))),
        JsValue::Null => Ok(JsValue::Object(interp.create_object_with_proto(None))),
        other => Err(interp.create_type_error(&format!(
            "Object prototype may only be an Object or null: {other}"
        ))),
    }
}

fn object_define_property(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let JsValue::Object(obj) = target else {
        return Err(interp.create_type_error("Object.defineProperty called on non-object"));
    };
    let key = interp.to_property_key(&arg(args, 1))?;
    let patch = interp.to_property_descriptor(&arg(args, 2))?;
    interp.define_own_property_or_throw(&obj, key, patch)?;
    Ok(target)
}

fn object_get_own_property_descriptor(
    interp: &mut Interpreter,
    _this: &JsValue,
    args: &[JsValue],
) -> JsResult<JsValue> {
    let obj = interp.to_object(&arg(args, 0))?;
    let key = interp.to_property_key(&arg(args, 1))?;
    match interp.get_own_property(&obj, key) {
        Some(desc) => Ok(interp.from_property_descriptor(&desc)),
        None => Ok(JsValue::Undefined),
    }
}

fn object_keys(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let obj = interp.to_object(&arg(args, 0))?;
    let names = interp
        .own_property_keys(&obj)
        .into_iter()
        .filter(|k| !k.is_symbol())
        .filter(|k| interp.get_own_property(&obj, k).is_some_and(|d| d.enumerable()))
        .map(|k| k.to_value())
        .collect();
    Ok(interp.create_array(names))
}

fn object_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    match this {
        JsValue::Undefined => return Ok(JsValue::from("[object Undefined]")),
        JsValue::Null => return Ok(JsValue::from("[object Null]")),
        _ => {}
    }
    let obj = interp.to_object(this)?;
    let builtin_tag = match interp.get_object(&obj).borrow().class_name() {
        tag @ ("Array" | "Function" | "Error" | "Boolean" | "Number" | "String" | "Arguments") => tag,
        _ => "Object",
    };
    let tag_key = interp.intrinsics.symbol_to_string_tag.clone();
    let tag = match interp.get(&obj, tag_key)? {
        JsValue::String(s) => s.to_rust_string(),
        _ => builtin_tag.to_string(),
    };
    Ok(JsValue::from(format!("[object {tag}]")))
}

fn object_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Object(interp.to_object(this)?))
}

fn object_has_own_property(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let obj = interp.to_object(this)?;
    Ok(JsValue::Boolean(interp.has_own_property(&obj, key)))
}

// Function

fn function_call(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let rest = args.get(1..).unwrap_or(&[]);
    interp.call(this, &arg(args, 0), rest)
}

fn function_apply(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    if !interp.is_callable(this) {
        return Err(interp.create_type_error("Function.prototype.apply was called on a non-function"));
    }
    let list = interp.create_list_from_array_like(&arg(args, 1))?;
    interp.call(this, &arg(args, 0), &list)
}

fn function_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let JsValue::Object(o) = this else {
        return Err(interp.create_type_error(
            "Function.prototype.toString requires that 'this' be a Function",
        ));
    };
    let source = match &interp.get_object(o).borrow().callable {
        Some(JsFunction::Native { name, .. }) => Some(format!("function {name}() {{ [native code] }}")),
        Some(JsFunction::User { name, kind, .. }) => Some(match kind {
            FunctionKind::ClassConstructor { .. } => format!("class {name} {{ }}"),
            _ => format!("function {name}() {{ [code] }}"),
        }),
        None => None,
    };
    match source {
        Some(source) => Ok(JsValue::from(source)),
        None => Err(interp.create_type_error(
            "Function.prototype.toString requires that 'this' be a Function",
        )),
    }
}

fn function_has_instance(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(interp.ordinary_has_instance(this, &arg(args, 0))?))
}

// Array

fn array_constructor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let elements = match args {
        [JsValue::Number(n)] => {
            let len = number_ops::to_uint32(*n);
            if f64::from(len) != *n {
                return Err(interp.create_range_error("Invalid array length"));
            }
            ArrayElements::with_length(len)
        }
        _ => ArrayElements::from_slots(
            args.iter()
                .map(|v| Some(PropertyDescriptor::data_default(v.clone())))
                .collect(),
        ),
    };
    let target = match (&interp.new_target, this) {
        (Some(_), JsValue::Object(o)) => *o,
        _ => {
            let proto = interp.intrinsics.array_prototype;
            interp.create_object_of_kind(&proto, ObjectKind::Ordinary)
        }
    };
    interp.get_object(&target).borrow_mut().kind = ObjectKind::Array(elements);
    Ok(JsValue::Object(target))
}

fn array_is_array(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(interp.is_array(&arg(args, 0))))
}

fn array_join(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let obj = interp.to_object(this)?;
    let len = interp.length_of_array_like(&obj)?;
    let separator = match arg(args, 0) {
        JsValue::Undefined => JsString::from_str(","),
        other => interp.to_js_string(&other)?,
    };
    let separators = (separator.len() as u64).saturating_mul(len.saturating_sub(1));
    if separators > JsString::MAX_LENGTH as u64 {
        return Err(interp.create_range_error("Invalid string length"));
    }
    let mut out: Vec<u16> = Vec::new();
    for i in 0..len {
        if i > 0 {
            out.extend_from_slice(&separator.code_units);
        }
        let element = interp.get(&obj, i)?;
        if !element.is_nullish() {
            out.extend(interp.to_js_string(&element)?.code_units);
        }
        if out.len() > JsString::MAX_LENGTH {
            return Err(interp.create_range_error("Invalid string length"));
        }
    }
    Ok(JsValue::String(JsString::from_code_units(out)))
}

fn array_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let obj = interp.to_object(this)?;
    let join = interp.get(&obj, "join")?;
    if interp.is_callable(&join) {
        return interp.call(&join, &JsValue::Object(obj), &[]);
    }
    object_to_string(interp, &JsValue::Object(obj), &[])
}

fn array_push(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let obj = interp.to_object(this)?;
    let receiver = JsValue::Object(obj);
    let mut len = interp.length_of_array_like(&obj)?;
    for item in args {
        if !interp.set(&obj, len, item.clone(), &receiver)? {
            return Err(interp.create_type_error(&format!(
                "Cannot assign to read only property '{len}' of object"
            )));
        }
        len += 1;
    }
    let new_len = JsValue::Number(len as f64);
    if !interp.set(&obj, "length", new_len.clone(), &receiver)? {
        return Err(interp.create_type_error(
            "Cannot assign to read only property 'length' of object",
        ));
    }
    Ok(new_len)
}

fn array_values(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let obj = interp.to_object(this)?;
    let proto = interp.intrinsics.array_iterator_prototype;
    let iter = interp.create_object_of_kind(
        &proto,
        ObjectKind::ArrayIterator {
            target: JsValue::Object(obj),
            index: 0,
            done: false,
        },
    );
    Ok(JsValue::Object(iter))
}

fn array_iterator_next(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let state = match this {
        JsValue::Object(o) => match &interp.get_object(o).borrow().kind {
            ObjectKind::ArrayIterator {
                target,
                index,
                done,
            } => Some((*o, target.clone(), *index, *done)),
            _ => None,
        },
        _ => None,
    };
    let Some((iter, target, index, done)) = state else {
        return Err(interp.create_type_error("next method called on incompatible receiver"));
    };
    if done {
        return Ok(interp.create_iter_result_object(JsValue::Undefined, true));
    }
    let JsValue::Object(target_obj) = target else {
        return Ok(interp.create_iter_result_object(JsValue::Undefined, true));
    };
    let len = interp.length_of_array_like(&target_obj)?;
    let next_state = if index as u64 >= len {
        None
    } else {
        Some(interp.get(&target_obj, index)?)
    };
    let data = interp.get_object(&iter);
    if let ObjectKind::ArrayIterator { index, done, .. } = &mut data.borrow_mut().kind {
        match next_state {
            Some(_) => *index += 1,
            None => *done = true,
        }
    }
    Ok(match next_state {
        Some(value) => interp.create_iter_result_object(value, false),
        None => interp.create_iter_result_object(JsValue::Undefined, true),
    })
}

// String, Number, Boolean

/// Stores a primitive in the receiver `new` allocated.
fn wrap_for_new(interp: &mut Interpreter, this: &JsValue, primitive: JsValue) -> JsResult<JsValue> {
    match (&interp.new_target, this) {
        (Some(_), JsValue::Object(o)) => {
            interp.get_object(o).borrow_mut().kind = ObjectKind::PrimitiveWrapper(primitive);
            Ok(this.clone())
        }
        _ => Ok(primitive),
    }
}

fn this_primitive(interp: &mut Interpreter, this: &JsValue, type_name: &str) -> JsResult<JsValue> {
    let unwrapped = match this {
        JsValue::Object(o) => match &interp.get_object(o).borrow().kind {
            ObjectKind::PrimitiveWrapper(v) => v.clone(),
            _ => JsValue::Undefined,
        },
        other => other.clone(),
    };
    if type_tag(&unwrapped) == type_name {
        return Ok(unwrapped);
    }
    Err(interp.create_type_error(&format!(
        "{type_name} value expected, got {}",
        type_tag(this)
    )))
}

fn string_constructor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = match args.first() {
        None => JsString::default(),
        Some(JsValue::Symbol(sym)) if interp.new_target.is_none() => JsString::from_str(&sym.to_string()),
        Some(v) => interp.to_js_string(v)?,
    };
    wrap_for_new(interp, this, JsValue::String(s))
}

fn string_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    this_primitive(interp, this, "string")
}

fn number_constructor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let n = match args.first() {
        None => 0.0,
        Some(v) => match interp.to_numeric(v)? {
            Numeric::Number(n) => n,
            Numeric::BigInt(b) => bigint_ops::to_f64(&b),
        },
    };
    wrap_for_new(interp, this, JsValue::Number(n))
}

fn number_to_string(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let n = this_primitive(interp, this, "number")?.as_number().unwrap_or(f64::NAN);
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        r => to_integer_or_infinity(interp.to_number(&r)?),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.create_range_error("toString() radix must be between 2 and 36"));
    }
    Ok(JsValue::from(format_radix(n, radix as u32)))
}

fn number_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    this_primitive(interp, this, "number")
}

fn boolean_constructor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let b = to_boolean(&arg(args, 0));
    wrap_for_new(interp, this, JsValue::Boolean(b))
}

fn boolean_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let b = this_primitive(interp, this, "boolean")?;
    Ok(JsValue::from(b.to_string()))
}

fn boolean_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    this_primitive(interp, this, "boolean")
}

// Symbol

fn symbol_constructor(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let description = match arg(args, 0) {
        JsValue::Undefined => None,
        other => Some(interp.to_js_string(&other)?.to_rust_string()),
    };
    Ok(JsValue::Symbol(interp.new_symbol(description.as_deref())))
}

fn symbol_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let sym = this_primitive(interp, this, "symbol")?;
    Ok(JsValue::from(sym.to_string()))
}

fn symbol_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    this_primitive(interp, this, "symbol")
}

fn symbol_description(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    match this_primitive(interp, this, "symbol")? {
        JsValue::Symbol(JsSymbol {
            description: Some(d),
            ..
        }) => Ok(JsValue::String(d)),
        _ => Ok(JsValue::Undefined),
    }
}

// BigInt

fn bigint_constructor(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let prim = interp.to_primitive(&arg(args, 0), PreferredType::Number)?;
    match &prim {
        JsValue::Number(n) => match bigint_ops::from_integral_f64(*n) {
            Some(b) => Ok(JsValue::from(b)),
            None => Err(interp.create_range_error(&format!(
                "The number {prim} cannot be converted to a BigInt because it is not an integer"
            ))),
        },
        JsValue::String(s) => match string_to_bigint(s) {
            Some(b) => Ok(JsValue::from(b)),
            None => Err(interp.create_syntax_error(&format!("Cannot convert {s} to a BigInt"))),
        },
        JsValue::Boolean(b) => Ok(JsValue::from(BigInt::from(u8::from(*b)))),
        JsValue::BigInt(_) => Ok(prim.clone()),
        other => Err(interp.create_type_error(&format!("Cannot convert {other} to a BigInt"))),
    }
}

fn bigint_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    match this_primitive(interp, this, "bigint")? {
        JsValue::BigInt(b) => Ok(JsValue::from(bigint_ops::to_string(&b.value))),
        _ => Ok(JsValue::Undefined),
    }
}

fn bigint_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    this_primitive(interp, this, "bigint")
}

// Errors

fn error_constructor(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    kind: ErrorKind,
) -> JsResult<JsValue> {
    let target = match (&interp.new_target, this) {
        (Some(_), JsValue::Object(o)) => *o,
        _ => {
            let proto = interp.intrinsics.error_prototype(kind);
            interp.create_object_of_kind(&proto, ObjectKind::Ordinary)
        }
    };
    interp.get_object(&target).borrow_mut().kind = ObjectKind::Error;
    let message = arg(args, 0);
    if !message.is_undefined() {
        let message = interp.to_js_string(&message)?;
        interp
            .get_object(&target)
            .borrow_mut()
            .insert_builtin("message".into_property_key(), JsValue::String(message));
    }
    Ok(JsValue::Object(target))
}

fn error_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let JsValue::Object(o) = this else {
        return Err(interp.create_type_error("Error.prototype.toString called on non-object"));
    };
    let name = match interp.get(o, "name")? {
        JsValue::Undefined => JsString::from_str("Error"),
        other => interp.to_js_string(&other)?,
    };
    let message = match interp.get(o, "message")? {
        JsValue::Undefined => JsString::default(),
        other => interp.to_js_string(&other)?,
    };
    Ok(JsValue::String(if name.is_empty() {
        message
    } else if message.is_empty() {
        name
    } else {
        name.concat(&JsString::from_str(": ")).concat(&message)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call_global(interp: &mut Interpreter, path: &[&str], this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let mut target = JsValue::Object(interp.global_object());
        for name in path {
            target = interp.get_v(&target, *name)?;
        }
        interp.call(&target, &this, args)
    }

    #[test]
    fn errors_have_names_and_prototype_chain() {
        let mut interp = Interpreter::new();
        let err = interp.create_type_error("boom");
        assert_eq!(interp.format_value(&err), "TypeError: boom");
        let global = JsValue::Object(interp.global_object());
        let type_error = interp.get_v(&global, "TypeError").unwrap();
        let error = interp.get_v(&global, "Error").unwrap();
        assert!(interp.instance_of(&err, &type_error).unwrap());
        assert!(interp.instance_of(&err, &error).unwrap());
        let parent = interp.get_prototype_of(type_error.as_object().unwrap());
        assert_eq!(parent.as_ref(), error.as_object());
    }

    #[test]
    fn error_constructor_with_and_without_new() {
        let mut interp = Interpreter::new();
        let global = JsValue::Object(interp.global_object());
        let range = interp.get_v(&global, "RangeError").unwrap();
        let called = interp.call(&range, &JsValue::Undefined, &[JsValue::from("x")]).unwrap();
        assert_eq!(interp.format_value(&called), "RangeError: x");
        let constructed = interp.construct(&range, &[JsValue::from("y")], None).unwrap();
        assert_eq!(interp.format_value(&constructed), "RangeError: y");
        let text = call_global(&mut interp, &["Error", "prototype", "toString"], constructed, &[]).unwrap();
        assert_eq!(interp.format_value(&text), "RangeError: y");
    }

    #[test]
    fn object_to_string_tags() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![]);
        let tag = call_global(&mut interp, &["Object", "prototype", "toString"], arr, &[]).unwrap();
        assert_eq!(interp.format_value(&tag), "[object Array]");
        let tag = call_global(&mut interp, &["Object", "prototype", "toString"], JsValue::Null, &[]).unwrap();
        assert_eq!(interp.format_value(&tag), "[object Null]");
        let sym = JsValue::Symbol(interp.new_symbol(None));
        let tag = call_global(&mut interp, &["Object", "prototype", "toString"], sym, &[]).unwrap();
        assert_eq!(interp.format_value(&tag), "[object Symbol]");
    }

    #[test]
    fn set_prototype_of_rejects_cycles() {
        let mut interp = Interpreter::new();
        let a = JsValue::Object(interp.create_object());
        let b = JsValue::Object(interp.create_object_with_proto(a.as_object()));
        let err = call_global(&mut interp, &["Object", "setPrototypeOf"], JsValue::Undefined, &[a, b]).unwrap_err();
        assert_eq!(interp.format_value(&err), "TypeError: Cyclic __proto__ value");
    }

    #[test]
    fn define_property_and_read_back_descriptor() {
        let mut interp = Interpreter::new();
        let obj = JsValue::Object(interp.create_object());
        let desc = interp.create_object();
        interp.create_data_property(&desc, "value", JsValue::Number(1.0)).unwrap();
        call_global(
            &mut interp,
            &["Object", "defineProperty"],
            JsValue::Undefined,
            &[obj.clone(), JsValue::from("k"), JsValue::Object(desc)],
        )
        .unwrap();
        let read = call_global(
            &mut interp,
            &["Object", "getOwnPropertyDescriptor"],
            JsValue::Undefined,
            &[obj.clone(), JsValue::from("k")],
        )
        .unwrap();
        assert!(matches!(interp.get_v(&read, "writable").unwrap(), JsValue::Boolean(false)));
        assert!(matches!(interp.get_v(&read, "configurable").unwrap(), JsValue::Boolean(false)));

        let again = interp.create_object();
        interp.create_data_property(&again, "value", JsValue::Number(2.0)).unwrap();
        let err = call_global(
            &mut interp,
            &["Object", "defineProperty"],
            JsValue::Undefined,
            &[obj, JsValue::from("k"), JsValue::Object(again)],
        )
        .unwrap_err();
        assert_eq!(interp.format_value(&err), "TypeError: Cannot redefine property: k");
    }

    #[test]
    fn array_constructor_validates_length() {
        let mut interp = Interpreter::new();
        let global = JsValue::Object(interp.global_object());
        let array = interp.get_v(&global, "Array").unwrap();
        let arr = interp.construct(&array, &[JsValue::Number(3.0)], None).unwrap();
        assert_eq!(interp.get_v(&arr, "length").unwrap().as_number(), Some(3.0));
        assert!(interp.is_array(&arr));
        let err = interp.construct(&array, &[JsValue::Number(-1.0)], None).unwrap_err();
        assert_eq!(interp.format_value(&err), "RangeError: Invalid array length");
        let huge = interp.construct(&array, &[JsValue::Number(4294967295.0)], None).unwrap();
        assert_eq!(interp.get_v(&huge, "length").unwrap().as_number(), Some(4294967295.0));
        assert!(interp.get_v(&huge, "4294967294").unwrap().is_undefined());
    }

    #[test]
    fn joining_a_huge_sparse_array_is_a_range_error() {
        let mut interp = Interpreter::new();
        let global = JsValue::Object(interp.global_object());
        let array = interp.get_v(&global, "Array").unwrap();
        let huge = interp.construct(&array, &[JsValue::Number(4294967295.0)], None).unwrap();
        let join = interp.get_v(&huge, "join").unwrap();
        let sep = JsValue::from("xxxxxxxxxxxxxxxx");
        let err = interp.call(&join, &huge, &[sep]).unwrap_err();
        assert_eq!(interp.format_value(&err), "RangeError: Invalid string length");
    }

    #[test]
    fn array_join_and_push() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![JsValue::Number(1.0), JsValue::Null]);
        let len = call_global(&mut interp, &["Array", "prototype", "push"], arr.clone(), &[JsValue::from("x")]).unwrap();
        assert_eq!(len.as_number(), Some(3.0));
        let joined = call_global(&mut interp, &["Array", "prototype", "join"], arr.clone(), &[JsValue::from("-")]).unwrap();
        assert_eq!(interp.format_value(&joined), "1--x");
        let s = interp.to_js_string(&arr).unwrap();
        assert_eq!(s.to_rust_string(), "1,,x");
    }

    #[test]
    fn wrappers_and_conversions() {
        let mut interp = Interpreter::new();
        let n = call_global(&mut interp, &["Number"], JsValue::Undefined, &[JsValue::from(" 12 ")]).unwrap();
        assert_eq!(n.as_number(), Some(12.0));
        let s = call_global(&mut interp, &["Number", "prototype", "toString"], JsValue::Number(255.0), &[JsValue::Number(16.0)]).unwrap();
        assert_eq!(interp.format_value(&s), "ff");
        let err = call_global(&mut interp, &["Number", "prototype", "toString"], JsValue::Number(1.0), &[JsValue::Number(1.0)]).unwrap_err();
        assert!(interp.format_value(&err).starts_with("RangeError"));
        let global = JsValue::Object(interp.global_object());
        let string_ctor = interp.get_v(&global, "String").unwrap();
        let wrapped = interp.construct(&string_ctor, &[JsValue::from("ab")], None).unwrap();
        assert_eq!(interp.typeof_value(&wrapped), "object");
        assert_eq!(interp.get_v(&wrapped, "length").unwrap().as_number(), Some(2.0));
        let b = call_global(&mut interp, &["BigInt"], JsValue::Undefined, &[JsValue::from("0x10")]).unwrap();
        assert!(matches!(b, JsValue::BigInt(ref b) if b.value == BigInt::from(16)));
        let err = call_global(&mut interp, &["BigInt"], JsValue::Undefined, &[JsValue::Number(1.5)]).unwrap_err();
        assert!(interp.format_value(&err).starts_with("RangeError"));
    }

    #[test]
    fn symbol_is_not_a_constructor() {
        let mut interp = Interpreter::new();
        let global = JsValue::Object(interp.global_object());
        let symbol = interp.get_v(&global, "Symbol").unwrap();
        let sym = interp.call(&symbol, &JsValue::Undefined, &[JsValue::from("d")]).unwrap();
        let description = interp.get_v(&sym, "description").unwrap();
        assert_eq!(interp.format_value(&description), "d");
        let err = interp.construct(&symbol, &[], None).unwrap_err();
        assert_eq!(interp.format_value(&err), "TypeError: Symbol is not a constructor");
        let iterator = interp.get_v(&symbol, "iterator").unwrap();
        assert!(matches!(iterator, JsValue::Symbol(ref s) if *s == interp.intrinsics.symbol_iterator));
    }

    #[test]
    fn array_iterator_walks_live_length() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![JsValue::Number(1.0)]);
        let iter = call_global(&mut interp, &["Array", "prototype", "values"], arr.clone(), &[]).unwrap();
        let next = interp.get_v(&iter, "next").unwrap();
        let first = interp.call(&next, &iter, &[]).unwrap();
        assert_eq!(interp.get_v(&first, "value").unwrap().as_number(), Some(1.0));
        let obj = *arr.as_object().unwrap();
        interp.create_data_property(&obj, 1u32, JsValue::Number(2.0)).unwrap();
        let second = interp.call(&next, &iter, &[]).unwrap();
        assert_eq!(interp.get_v(&second, "value").unwrap().as_number(), Some(2.0));
        let third = interp.call(&next, &iter, &[]).unwrap();
        assert!(matches!(interp.get_v(&third, "done").unwrap(), JsValue::Boolean(true)));
    }
}
