use super::*;
use tracing::instrument;

impl Interpreter {
    fn function_of(&self, value: &JsValue) -> Option<(JsObject, JsFunction)> {
        let JsValue::Object(o) = value else {
            return None;
        };
        let callable = self.get_object(o).borrow().callable.clone();
        callable.map(|f| (*o, f))
    }

    /// [[Call]]. Natives run their closure; user functions get a fresh
    /// function environment and execution context.
    #[instrument(level = "debug", skip_all, fields(depth = self.contexts.len()))]
    pub fn call(&mut self, func: &JsValue, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let Some((callee, function)) = self.function_of(func) else {
            let shown = describe_value(func);
            return Err(self.create_type_error(&format!("{shown} is not a function")));
        };
        match &function {
            JsFunction::Native { func: native, .. } => {
                let saved = self.new_target.take();
                let result = native(self, this, args).into_value();
                self.new_target = saved;
                result
            }
            JsFunction::User {
                kind: FunctionKind::ClassConstructor { .. },
                name,
                ..
            } => Err(self.create_type_error(&format!(
                "Class constructor {name} cannot be invoked without 'new'"
            ))),
            JsFunction::User {
                kind, is_strict, ..
            } => {
                let this = if *kind == FunctionKind::Arrow {
                    ThisBinding::Lexical
                } else if *is_strict {
                    ThisBinding::Initialized(this.clone())
                } else if this.is_nullish() {
                    ThisBinding::Initialized(JsValue::Object(self.intrinsics.global_object))
                } else {
                    ThisBinding::Initialized(JsValue::Object(self.to_object(this)?))
                };
                let (value, _) =
                    self.run_user_function(&callee, &function, this, args, JsValue::Undefined)?;
                Ok(value)
            }
        }
    }

    /// [[Construct]]. `new_target` defaults to `func` itself.
    #[instrument(level = "debug", skip_all, fields(depth = self.contexts.len()))]
    pub fn construct(
        &mut self,
        func: &JsValue,
        args: &[JsValue],
        new_target: Option<&JsValue>,
    ) -> JsResult<JsValue> {
        let new_target = new_target.unwrap_or(func).clone();
        let Some((callee, function)) = self
            .function_of(func)
            .filter(|(_, f)| f.is_constructor())
        else {
            let shown = match self.function_of(func) {
                Some((_, f)) if !f.name().is_empty() => f.name().to_string(),
                _ => describe_value(func),
            };
            return Err(self.create_type_error(&format!("{shown} is not a constructor")));
        };
        match &function {
            JsFunction::Native { func: native, .. } => {
                let fallback = self.intrinsics.object_prototype;
                let proto = self.get_prototype_from_constructor(&new_target, fallback)?;
                let receiver = JsValue::Object(self.create_object_with_proto(Some(&proto)));
                let saved = self.new_target.replace(new_target);
                let result = native(self, &receiver, args).into_value();
                self.new_target = saved;
                let value = result?;
                Ok(if value.is_object() { value } else { receiver })
            }
            JsFunction::User {
                kind: FunctionKind::ClassConstructor { derived: true },
                ..
            } => {
                let (value, env) = self.run_user_function(
                    &callee,
                    &function,
                    ThisBinding::Uninitialized,
                    args,
                    new_target,
                )?;
                if value.is_object() {
                    return Ok(value);
                }
                if !value.is_undefined() {
                    return Err(self.create_type_error(
                        "Derived constructors may only return object or undefined",
                    ));
                }
                self.resolve_this(&env)
            }
            JsFunction::User { .. } => {
                let fallback = self.intrinsics.object_prototype;
                let proto = self.get_prototype_from_constructor(&new_target, fallback)?;
                let this_obj = self.create_object_with_proto(Some(&proto));
                let this = JsValue::Object(this_obj);
                self.initialize_instance_fields(&this_obj, &callee)?;
                let (value, _) = self.run_user_function(
                    &callee,
                    &function,
                    ThisBinding::Initialized(this.clone()),
                    args,
                    new_target,
                )?;
                Ok(if value.is_object() { value } else { this })
            }
        }
    }

    /// GetPrototypeFromConstructor: `newTarget.prototype` if it is an
    /// object, otherwise the intrinsic fallback.
    pub(crate) fn get_prototype_from_constructor(
        &mut self,
        constructor: &JsValue,
        fallback: JsObject,
    ) -> JsResult<JsObject> {
        match self.get_v(constructor, "prototype")? {
            JsValue::Object(proto) => Ok(proto),
            _ => Ok(fallback),
        }
    }

    /// Binds parameters and runs the body of a user function. Returns the
    /// function's result and the environment it ran in.
    fn run_user_function(
        &mut self,
        callee: &JsObject,
        function: &JsFunction,
        this: ThisBinding,
        args: &[JsValue],
        new_target: JsValue,
    ) -> JsResult<(JsValue, EnvRef)> {
        let JsFunction::User {
            name,
            params,
            body,
            closure,
            kind,
            is_strict,
            home_object,
            ..
        } = function
        else {
            unreachable!("run_user_function called with a native function");
        };
        let scope = FunctionScope {
            this,
            function: Some(*callee),
            new_target,
            home_object: *home_object,
        };
        let env = Environment::new_function(closure.clone(), scope, *is_strict);
        self.enter_context(env.clone(), name)?;
        let result = ensure_sufficient_stack(|| {
            self.evaluate_function_body(callee, params, body, *kind, args, &env)
        });
        self.exit_context(&env);
        result.map(|value| (value, env))
    }

    fn evaluate_function_body(
        &mut self,
        callee: &JsObject,
        params: &[Pattern],
        body: &[Statement],
        kind: FunctionKind,
        args: &[JsValue],
        env: &EnvRef,
    ) -> JsResult<JsValue> {
        if kind != FunctionKind::Arrow && !shadows_arguments(params, body) {
            let arguments = self.create_arguments_object(callee, args, env.borrow().strict);
            self.declare_binding(env, "arguments", BindingKind::Var)?;
            self.initialize_binding(env, "arguments", arguments);
        }
        for (i, param) in params.iter().enumerate() {
            if let Pattern::Rest(inner) = param {
                let rest = self.create_array(args.get(i..).unwrap_or(&[]).to_vec());
                self.bind_pattern(inner, rest, BindingMode::Declare(BindingKind::Var), env)?;
                break;
            }
            let value = args.get(i).cloned().unwrap_or(JsValue::Undefined);
            self.bind_pattern(param, value, BindingMode::Declare(BindingKind::Var), env)?;
        }
        self.instantiate_var_scope(body, env)?;
        match self.exec_statements(body, env) {
            Completion::Normal(_) => Ok(JsValue::Undefined),
            Completion::Return(v) => Ok(v),
            Completion::Throw(e) => Err(e),
            Completion::Break(_) => Err(self.create_syntax_error("Illegal break statement")),
            Completion::Continue(_) => {
                Err(self.create_syntax_error("Illegal continue statement: no surrounding iteration statement"))
            }
        }
    }

    /// An unmapped arguments object: indices, `length`, `@@iterator` and,
    /// in sloppy code, `callee`.
    fn create_arguments_object(&mut self, callee: &JsObject, args: &[JsValue], strict: bool) -> JsValue {
        let proto = self.intrinsics.object_prototype;
        let obj = self.create_object_of_kind(&proto, ObjectKind::Arguments);
        let iterator = self.intrinsics.symbol_iterator.clone();
        let values = self.intrinsics.array_values.clone();
        let data = self.get_object(&obj);
        let mut o = data.borrow_mut();
        for (i, arg) in args.iter().enumerate() {
            o.insert_value(i.into_property_key(), arg.clone());
        }
        o.insert_builtin(
            "length".into_property_key(),
            JsValue::Number(args.len() as f64),
        );
        o.insert_builtin(iterator.into_property_key(), values);
        if !strict {
            o.insert_builtin("callee".into_property_key(), JsValue::Object(*callee));
        }
        JsValue::Object(obj)
    }

    /// Creates a closure over `env`.
    pub(crate) fn instantiate_function(
        &mut self,
        name: &str,
        params: &[Pattern],
        body: Vec<Statement>,
        env: &EnvRef,
        kind: FunctionKind,
        home_object: Option<JsObject>,
    ) -> JsValue {
        let is_strict = env.borrow().strict || is_strict_mode_body(&body);
        self.create_function(JsFunction::User {
            name: name.to_string(),
            params: Rc::new(params.to_vec()),
            body: Rc::new(body),
            closure: env.clone(),
            kind,
            is_strict,
            home_object,
            fields: Rc::new(Vec::new()),
        })
    }

    /// `super(...args)` inside a derived constructor: constructs the parent
    /// with the current `new.target`, binds the result as `this` and runs
    /// this class's field initializers.
    pub(crate) fn super_call(&mut self, env: &EnvRef, args: &[JsValue]) -> JsResult<JsValue> {
        let active = self.resolve_active_function(env);
        let derived = active.is_some_and(|f| {
            self.get_object(&f)
                .borrow()
                .callable
                .as_ref()
                .is_some_and(JsFunction::is_derived_constructor)
        });
        let Some(active) = active.filter(|_| derived) else {
            return Err(self.create_syntax_error("'super' keyword unexpected here"));
        };
        let new_target = self.resolve_new_target(env);
        let parent = self
            .get_prototype_of(&active)
            .map_or(JsValue::Null, JsValue::Object);
        if !self.is_constructor(&parent) {
            return Err(self.create_type_error("Super constructor is not a constructor"));
        }
        let result = self.construct(&parent, args, Some(&new_target))?;
        self.bind_this(env, result.clone())?;
        if let JsValue::Object(instance) = &result {
            self.initialize_instance_fields(instance, &active)?;
        }
        Ok(result)
    }

    /// Defines the instance fields declared by `constructor`'s class on
    /// `receiver`, in declaration order.
    pub(crate) fn initialize_instance_fields(
        &mut self,
        receiver: &JsObject,
        constructor: &JsObject,
    ) -> JsResult<()> {
        let (fields, closure, home_object) = match &self.get_object(constructor).borrow().callable {
            Some(JsFunction::User {
                fields,
                closure,
                home_object,
                ..
            }) if !fields.is_empty() => (fields.clone(), closure.clone(), *home_object),
            _ => return Ok(()),
        };
        for field in fields.iter() {
            let value = match &field.initializer {
                Some(init) => {
                    let scope = FunctionScope {
                        this: ThisBinding::Initialized(JsValue::Object(*receiver)),
                        function: Some(*constructor),
                        new_target: JsValue::Undefined,
                        home_object,
                    };
                    let env = Environment::new_function(closure.clone(), scope, true);
                    let value = self.eval_value(init, &env)?;
                    if init.is_anonymous_function_definition() {
                        self.set_function_name(&value, &field.key, None);
                    }
                    value
                }
                None => JsValue::Undefined,
            };
            self.create_data_property_or_throw(receiver, field.key.clone(), value)?;
        }
        Ok(())
    }
}

/// A parameter or top-level declaration named `arguments` replaces the
/// arguments object.
fn shadows_arguments(params: &[Pattern], body: &[Statement]) -> bool {
    let mut names = Vec::new();
    for param in params {
        bound_names(param, &mut names);
    }
    names.extend(top_level_declared_names(body));
    names.iter().any(|n| n == "arguments")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::config::EngineConfig;
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

    #[test]
    fn missing_arguments_are_undefined_and_extras_ignored() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                function("f", &["a", "b"], vec![ret(Expression::Typeof(Box::new(ident("b"))))]),
                expr(call(ident("f"), vec![num(1.0)])),
            ],
        );
        assert_eq!(interp.format_value(&v), "undefined");
        let v = eval(
            &mut interp,
            vec![
                function("g", &["a"], vec![ret(member(ident("arguments"), "length"))]),
                expr(call(ident("g"), vec![num(1.0), num(2.0), num(3.0)])),
            ],
        );
        assert_eq!(v.as_number(), Some(3.0));
    }

    #[test]
    fn declarations_named_arguments_replace_the_arguments_object() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                function("f", &[], vec![let_("arguments", Some(num(1.0))), ret(ident("arguments"))]),
                expr(call(ident("f"), vec![num(9.0)])),
            ],
        );
        assert_eq!(v.as_number(), Some(1.0));
        let v = eval(
            &mut interp,
            vec![
                function("g", &["arguments"], vec![ret(ident("arguments"))]),
                expr(call(ident("g"), vec![num(5.0)])),
            ],
        );
        assert_eq!(v.as_number(), Some(5.0));
        let v = eval(
            &mut interp,
            vec![
                function(
                    "h",
                    &[],
                    vec![
                        function("arguments", &[], vec![ret(num(7.0))]),
                        ret(call(ident("arguments"), vec![])),
                    ],
                ),
                expr(call(ident("h"), vec![])),
            ],
        );
        assert_eq!(v.as_number(), Some(7.0));
    }

    #[test]
    fn defaults_and_rest_parameters() {
        let mut interp = Interpreter::new();
        let f = Statement::FunctionDeclaration(FunctionDecl {
            name: "f".into(),
            params: vec![
                Pattern::Assign(Box::new(Pattern::Identifier("a".into())), Box::new(num(10.0))),
                Pattern::Rest(Box::new(Pattern::Identifier("rest".into()))),
            ],
            body: vec![ret(binary(BinaryOp::Add, ident("a"), member(ident("rest"), "length")))],
        });
        let v = eval(
            &mut interp,
            vec![
                f,
                expr(call(ident("f"), vec![Expression::Identifier("undefined".into()), num(0.0), num(0.0)])),
            ],
        );
        assert_eq!(v.as_number(), Some(12.0));
    }

    #[test]
    fn sloppy_this_is_global_strict_this_is_undefined() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                function("f", &[], vec![ret(this())]),
                expr(binary(BinaryOp::StrictEq, call(ident("f"), vec![]), ident("globalThis"))),
            ],
        );
        assert!(matches!(v, JsValue::Boolean(true)));
        let v = eval(
            &mut interp,
            vec![
                function("g", &[], vec![expr(string("use strict")), ret(this())]),
                expr(call(ident("g"), vec![])),
            ],
        );
        assert!(v.is_undefined());
    }

    #[test]
    fn calling_non_callables_and_constructing_arrows() {
        let mut interp = Interpreter::new();
        let msg = eval_err(&mut interp, vec![var("x", Some(num(1.0))), expr(call(ident("x"), vec![]))]);
        assert_eq!(msg, "TypeError: x is not a function");
        let msg = eval_err(
            &mut interp,
            vec![const_("a", arrow(&[], num(1.0))), expr(new(ident("a"), vec![]))],
        );
        assert_eq!(msg, "TypeError: a is not a constructor");
    }

    #[test]
    fn constructor_object_return_wins() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                function(
                    "F",
                    &[],
                    vec![
                        expr(assign(member(this(), "a"), num(1.0))),
                        ret(object(vec![("b", num(2.0))])),
                    ],
                ),
                expr(new(ident("F"), vec![])),
            ],
        );
        assert!(interp.get_v(&v, "a").unwrap().is_undefined());
        assert_eq!(interp.get_v(&v, "b").unwrap().as_number(), Some(2.0));
        let v = eval(
            &mut interp,
            vec![
                function("G", &[], vec![expr(assign(member(this(), "a"), num(1.0))), ret(num(5.0))]),
                expr(new(ident("G"), vec![])),
            ],
        );
        assert_eq!(interp.get_v(&v, "a").unwrap().as_number(), Some(1.0));
    }

    #[test]
    fn new_uses_prototype_property() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                function("F", &[], vec![]),
                expr(assign(member(member(ident("F"), "prototype"), "k"), num(7.0))),
                expr(member(new(ident("F"), vec![]), "k")),
            ],
        );
        assert_eq!(v.as_number(), Some(7.0));
        let v = eval(
            &mut interp,
            vec![
                function("H", &[], vec![]),
                expr(assign(member(ident("H"), "prototype"), num(1.0))),
                expr(call(
                    member(member(ident("Object"), "getPrototypeOf"), "call"),
                    vec![null(), new(ident("H"), vec![])],
                )),
            ],
        );
        let object_proto = interp.intrinsics.object_prototype;
        assert!(same_value(&v, &JsValue::Object(object_proto)));
    }

    #[test]
    fn runaway_recursion_is_a_catchable_range_error() {
        let mut interp = Interpreter::with_config(EngineConfig::default().with_max_call_depth(64));
        let v = eval(
            &mut interp,
            vec![
                function("r", &[], vec![ret(call(ident("r"), vec![]))]),
                try_(
                    vec![expr(call(ident("r"), vec![]))],
                    Some(("e", vec![expr(member(ident("e"), "message"))])),
                    None,
                ),
            ],
        );
        assert_eq!(interp.format_value(&v), "Maximum call stack size exceeded");
        assert_eq!(interp.call_depth(), 0);
    }

    #[test]
    fn native_call_sees_no_stale_new_target() {
        let mut interp = Interpreter::new();
        let global = JsValue::Object(interp.global_object());
        let string_ctor = interp.get_v(&global, "String").unwrap();
        let plain = interp.call(&string_ctor, &JsValue::Undefined, &[JsValue::Number(1.0)]).unwrap();
        assert!(matches!(plain, JsValue::String(_)));
        let wrapped = interp.construct(&string_ctor, &[JsValue::Number(1.0)], None).unwrap();
        assert!(wrapped.is_object());
        assert!(interp.new_target.is_none());
    }

    #[test]
    fn arguments_object_is_iterable_and_has_callee() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                function(
                    "f",
                    &[],
                    vec![ret(binary(
                        BinaryOp::StrictEq,
                        member(ident("arguments"), "callee"),
                        ident("f"),
                    ))],
                ),
                expr(call(ident("f"), vec![])),
            ],
        );
        assert!(matches!(v, JsValue::Boolean(true)));
        let v = eval(
            &mut interp,
            vec![
                function("g", &[], vec![ret(Expression::Array(vec![Some(Expression::Spread(Box::new(ident("arguments"))))]))]),
                expr(call(ident("g"), vec![num(4.0), num(5.0)])),
            ],
        );
        assert_eq!(interp.get_v(&v, 1u32).unwrap().as_number(), Some(5.0));
    }
}
