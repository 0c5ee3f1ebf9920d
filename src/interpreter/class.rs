use super::*;

/// Placement of a method defined by a class body or object literal.
#[derive(Clone, Copy)]
pub(crate) enum MethodKind {
    Method,
    Getter,
    Setter,
}

impl Interpreter {
    /// ClassDefinitionEvaluation. Class bodies are always strict.
    pub(crate) fn eval_class(
        &mut self,
        name: Option<&str>,
        super_class: Option<&Expression>,
        body: &[ClassElement],
        env: &EnvRef,
    ) -> JsResult<JsValue> {
        let class_env = Environment::new(Some(env.clone()));
        class_env.borrow_mut().strict = true;
        if let Some(name) = name {
            self.declare_binding(&class_env, name, BindingKind::Const)?;
        }

        let (proto_parent, ctor_parent) = match super_class {
            None => (
                Some(self.intrinsics.object_prototype),
                self.intrinsics.function_prototype,
            ),
            Some(expr) => {
                let parent = self.eval_value(expr, &class_env)?;
                self.class_heritage(&parent)?
            }
        };
        let derived = super_class.is_some();
        let proto = self.create_object_with_proto(proto_parent.as_ref());

        let ctor_def = body.iter().find_map(|el| match el {
            ClassElement::Method(m) if m.kind == ClassMethodKind::Constructor && !m.is_static => {
                Some(m.value.clone())
            }
            _ => None,
        });
        let ctor_def = ctor_def.unwrap_or_else(|| default_constructor(derived));
        let ctor = self.instantiate_function(
            name.unwrap_or(""),
            &ctor_def.params,
            ctor_def.body,
            &class_env,
            FunctionKind::ClassConstructor { derived },
            Some(proto),
        );
        let JsValue::Object(ctor_obj) = ctor else {
            unreachable!("instantiate_function always returns an object");
        };
        let ctor_parent = self.get_object(&ctor_parent);
        {
            let data = self.get_object(&ctor_obj);
            let mut c = data.borrow_mut();
            c.prototype = Some(ctor_parent);
            c.insert_property(
                "prototype".into_property_key(),
                PropertyDescriptor::data(JsValue::Object(proto), false, false, false),
            );
        }
        self.get_object(&proto)
            .borrow_mut()
            .insert_builtin("constructor".into_property_key(), ctor.clone());

        let mut instance_fields = Vec::new();
        let mut static_fields = Vec::new();
        for element in body {
            match element {
                ClassElement::Method(m) if m.kind == ClassMethodKind::Constructor && !m.is_static => {}
                ClassElement::Method(m) => {
                    let target = if m.is_static { ctor_obj } else { proto };
                    let key = self.eval_property_name(&m.key, &class_env)?;
                    let kind = match m.kind {
                        ClassMethodKind::Get => MethodKind::Getter,
                        ClassMethodKind::Set => MethodKind::Setter,
                        ClassMethodKind::Method | ClassMethodKind::Constructor => MethodKind::Method,
                    };
                    self.define_method_property(&target, key, &m.value, kind, false, &class_env)?;
                }
                ClassElement::Property(p) => {
                    let key = self.eval_property_name(&p.key, &class_env)?;
                    let def = ClassFieldDef {
                        key,
                        initializer: p.value.clone(),
                    };
                    if p.is_static {
                        static_fields.push(def);
                    } else {
                        instance_fields.push(def);
                    }
                }
            }
        }

        if let Some(JsFunction::User { fields, .. }) = &mut self.get_object(&ctor_obj).borrow_mut().callable {
            *fields = Rc::new(instance_fields);
        }
        if let Some(name) = name {
            self.initialize_binding(&class_env, name, ctor.clone());
        }

        for field in static_fields {
            let value = match &field.initializer {
                Some(init) => {
                    let scope = FunctionScope {
                        this: ThisBinding::Initialized(ctor.clone()),
                        function: Some(ctor_obj),
                        new_target: JsValue::Undefined,
                        home_object: Some(ctor_obj),
                    };
                    let env = Environment::new_function(class_env.clone(), scope, true);
                    let value = self.eval_value(init, &env)?;
                    if init.is_anonymous_function_definition() {
                        self.set_function_name(&value, &field.key, None);
                    }
                    value
                }
                None => JsValue::Undefined,
            };
            self.create_data_property_or_throw(&ctor_obj, field.key, value)?;
        }
        Ok(ctor)
    }

    /// Validates an `extends` value; returns the prototype parent and the
    /// constructor parent.
    fn class_heritage(&mut self, parent: &JsValue) -> JsResult<(Option<JsObject>, JsObject)> {
        if parent.is_null() {
            return Ok((None, self.intrinsics.function_prototype));
        }
        let JsValue::Object(parent_obj) = parent else {
            return Err(self.create_type_error(&format!(
                "Class extends value {} is not a constructor or null",
                describe_value(parent)
            )));
        };
        if !self.is_constructor(parent) {
            return Err(self.create_type_error(&format!(
                "Class extends value {} is not a constructor or null",
                self.format_value(parent)
            )));
        }
        match self.get(parent_obj, "prototype")? {
            JsValue::Object(p) => Ok((Some(p), *parent_obj)),
            JsValue::Null => Ok((None, *parent_obj)),
            other => Err(self.create_type_error(&format!(
                "Class extends value does not have valid prototype property {other}"
            ))),
        }
    }

    /// Defines a method, getter or setter whose home object is `target`.
    /// Object literals make them enumerable, classes do not.
    pub(crate) fn define_method_property(
        &mut self,
        target: &JsObject,
        key: PropertyKey,
        def: &FunctionExpr,
        kind: MethodKind,
        enumerable: bool,
        env: &EnvRef,
    ) -> JsResult<()> {
        let func = self.instantiate_function(
            "",
            &def.params,
            def.body.clone(),
            env,
            FunctionKind::Method,
            Some(*target),
        );
        let (prefix, patch) = match kind {
            MethodKind::Method => (
                None,
                PropertyDescriptorPatch::from(PropertyDescriptor::data(
                    func.clone(),
                    true,
                    enumerable,
                    true,
                )),
            ),
            MethodKind::Getter => (
                Some("get"),
                PropertyDescriptorPatch {
                    get: Some(func.clone()),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..Default::default()
                },
            ),
            MethodKind::Setter => (
                Some("set"),
                PropertyDescriptorPatch {
                    set: Some(func.clone()),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..Default::default()
                },
            ),
        };
        self.set_function_name(&func, &key, prefix);
        self.define_own_property_or_throw(target, key, patch)
    }
}

/// `constructor() {}` or `constructor(...args) { super(...args); }`.
fn default_constructor(derived: bool) -> FunctionExpr {
    if !derived {
        return FunctionExpr {
            name: None,
            params: Vec::new(),
            body: Vec::new(),
        };
    }
    FunctionExpr {
        name: None,
        params: vec![Pattern::Rest(Box::new(Pattern::Identifier("args".into())))],
        body: vec![Statement::Expression(Expression::SuperCall(vec![
            Expression::Spread(Box::new(Expression::Identifier("args".into()))),
        ]))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use pretty_assertions::assert_eq;

    fn eval(interp: &mut Interpreter, body: Vec<Statement>) -> JsValue {
        interp.evaluate(&program(body)).unwrap()
    }

    fn eval_err(interp: &mut Interpreter, body: Vec<Statement>) -> String {
        match interp.evaluate(&program(body)).unwrap_err() {
            EngineError::Uncaught { message, .. } => message,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn base_class() -> Statement {
        class(
            "A",
            None,
            vec![
                constructor(&["x"], vec![expr(assign(member(this(), "x"), ident("x")))]),
                method("getX", &[], vec![ret(member(this(), "x"))]),
            ],
        )
    }

    #[test]
    fn class_layout_and_attributes() {
        let mut interp = Interpreter::new();
        let a = eval(&mut interp, vec![base_class(), expr(ident("A"))]);
        let a_obj = *a.as_object().unwrap();
        let proto_desc = interp.get_own_property(&a_obj, "prototype").unwrap();
        assert!(!proto_desc.writable() && !proto_desc.enumerable() && !proto_desc.configurable());
        let proto = interp.get(&a_obj, "prototype").unwrap();
        let proto_obj = *proto.as_object().unwrap();
        let method_desc = interp.get_own_property(&proto_obj, "getX").unwrap();
        assert!(!method_desc.enumerable());
        let ctor_desc = interp.get_own_property(&proto_obj, "constructor").unwrap();
        assert!(!ctor_desc.enumerable());
        assert_eq!(interp.typeof_value(&a), "function");
        let name = interp.get(&a_obj, "name").unwrap();
        assert_eq!(interp.format_value(&name), "A");
    }

    #[test]
    fn class_constructor_requires_new() {
        let mut interp = Interpreter::new();
        let msg = eval_err(&mut interp, vec![base_class(), expr(call(ident("A"), vec![num(1.0)]))]);
        assert_eq!(msg, "TypeError: Class constructor A cannot be invoked without 'new'");
    }

    #[test]
    fn derived_construction_orders_this_and_prototype() {
        let mut interp = Interpreter::new();
        let b = class(
            "B",
            Some(ident("A")),
            vec![constructor(
                &[],
                vec![
                    expr(super_call(vec![num(5.0)])),
                    expr(assign(member(this(), "y"), num(2.0))),
                ],
            )],
        );
        let v = eval(&mut interp, vec![base_class(), b, const_("b", new(ident("B"), vec![])), expr(ident("b"))]);
        assert_eq!(interp.get_v(&v, "x").unwrap().as_number(), Some(5.0));
        assert_eq!(interp.get_v(&v, "y").unwrap().as_number(), Some(2.0));
        let is_b = eval(&mut interp, vec![expr(binary(BinaryOp::Instanceof, ident("b"), ident("B")))]);
        assert!(matches!(is_b, JsValue::Boolean(true)));
        let via_method = eval(&mut interp, vec![expr(call(member(ident("b"), "getX"), vec![]))]);
        assert_eq!(via_method.as_number(), Some(5.0));
    }

    #[test]
    fn this_before_super_is_rejected() {
        let mut interp = Interpreter::new();
        let c = class(
            "C",
            Some(ident("A")),
            vec![constructor(
                &[],
                vec![expr(assign(member(this(), "y"), num(1.0))), expr(super_call(vec![]))],
            )],
        );
        let msg = eval_err(&mut interp, vec![base_class(), c, expr(new(ident("C"), vec![]))]);
        assert_eq!(
            msg,
            "TypeError: Must call super constructor in derived class before accessing 'this'"
        );
    }

    #[test]
    fn double_super_and_missing_super() {
        let mut interp = Interpreter::new();
        let twice = class(
            "D",
            Some(ident("A")),
            vec![constructor(&[], vec![expr(super_call(vec![])), expr(super_call(vec![]))])],
        );
        let msg = eval_err(&mut interp, vec![base_class(), twice, expr(new(ident("D"), vec![]))]);
        assert_eq!(msg, "ReferenceError: Super constructor may only be called once");
        let never = class("E", Some(ident("A")), vec![constructor(&[], vec![])]);
        let msg = eval_err(&mut interp, vec![never, expr(new(ident("E"), vec![]))]);
        assert_eq!(
            msg,
            "TypeError: Must call super constructor in derived class before accessing 'this'"
        );
    }

    #[test]
    fn default_derived_constructor_forwards_arguments() {
        let mut interp = Interpreter::new();
        let f = class("F", Some(ident("A")), vec![]);
        let v = eval(&mut interp, vec![base_class(), f, expr(member(new(ident("F"), vec![num(9.0)]), "x"))]);
        assert_eq!(v.as_number(), Some(9.0));
    }

    #[test]
    fn fields_initialize_per_instance() {
        let mut interp = Interpreter::new();
        let g = class(
            "G",
            None,
            vec![field("a", Some(num(1.0))), field("b", Some(binary(BinaryOp::Add, member(this(), "a"), num(1.0))))],
        );
        let v = eval(&mut interp, vec![g, expr(member(new(ident("G"), vec![]), "b"))]);
        assert_eq!(v.as_number(), Some(2.0));
        let h = class("H", Some(ident("G")), vec![field("c", Some(member(this(), "b")))]);
        let v = eval(&mut interp, vec![h, expr(member(new(ident("H"), vec![]), "c"))]);
        assert_eq!(v.as_number(), Some(2.0));
    }

    #[test]
    fn extends_validation() {
        let mut interp = Interpreter::new();
        let msg = eval_err(&mut interp, vec![class("X", Some(num(1.0)), vec![])]);
        assert_eq!(msg, "TypeError: Class extends value 1 is not a constructor or null");
        let msg = eval_err(
            &mut interp,
            vec![
                function("P", &[], vec![]),
                expr(assign(member(ident("P"), "prototype"), num(3.0))),
                class("Y", Some(ident("P")), vec![]),
            ],
        );
        assert_eq!(
            msg,
            "TypeError: Class extends value does not have valid prototype property 3"
        );
    }

    #[test]
    fn super_property_reads_parent_prototype() {
        let mut interp = Interpreter::new();
        let k = class(
            "K",
            Some(ident("A")),
            vec![method(
                "getX",
                &[],
                vec![ret(binary(
                    BinaryOp::Mul,
                    call(Expression::SuperMember(MemberProperty::Dot("getX".into())), vec![]),
                    num(10.0),
                ))],
            )],
        );
        let v = eval(
            &mut interp,
            vec![base_class(), k, expr(call(member(new(ident("K"), vec![num(4.0)]), "getX"), vec![]))],
        );
        assert_eq!(v.as_number(), Some(40.0));
    }

    #[test]
    fn subclassing_builtins_keeps_exotic_behavior() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                class("L", Some(ident("Array")), vec![]),
                const_("l", new(ident("L"), vec![])),
                expr(call(member(ident("l"), "push"), vec![num(1.0), num(2.0)])),
                expr(ident("l")),
            ],
        );
        assert!(interp.is_array(&v));
        assert_eq!(interp.get_v(&v, "length").unwrap().as_number(), Some(2.0));
        let is_l = eval(&mut interp, vec![expr(binary(BinaryOp::Instanceof, ident("l"), ident("L")))]);
        assert!(matches!(is_l, JsValue::Boolean(true)));
        let err = eval(
            &mut interp,
            vec![
                class("M", Some(ident("Error")), vec![]),
                expr(call(member(new(ident("M"), vec![string("m")]), "toString"), vec![])),
            ],
        );
        assert_eq!(interp.format_value(&err), "Error: m");
    }
}
