use super::*;

/// Grows the native stack when deep recursion nears its end, so the
/// configured call-depth limit is what bounds recursion.
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

impl Interpreter {
    /// Number of active function contexts.
    pub fn call_depth(&self) -> usize {
        self.contexts.len()
    }

    /// The environment of the innermost active function, or the global one.
    pub fn current_env(&self) -> EnvRef {
        match self.contexts.last() {
            Some(ctx) => ctx.env.clone(),
            None => self.global_env.clone(),
        }
    }

    pub(crate) fn enter_context(&mut self, env: EnvRef, function_name: &str) -> JsResult<()> {
        let depth = self.contexts.len();
        if depth >= self.config.max_call_depth {
            tracing::debug!(depth, function = function_name, "call depth limit reached");
            return Err(self.create_range_error("Maximum call stack size exceeded"));
        }
        tracing::trace!(depth, function = function_name, "enter context");
        self.contexts.push(ExecutionContext {
            env,
            function_name: function_name.to_string(),
        });
        Ok(())
    }

    pub(crate) fn exit_context(&mut self, env: &EnvRef) {
        let Some(top) = self.contexts.pop() else {
            panic!("exit_context with an empty context stack");
        };
        assert!(
            Rc::ptr_eq(&top.env, env),
            "exiting a context that is not on top (top is {:?})",
            top.function_name
        );
        tracing::trace!(depth = self.contexts.len(), function = %top.function_name, "exit context");
    }

    /// Host-facing declaration of a mutable binding in the current scope.
    pub fn declare_variable(&mut self, name: &str, value: JsValue) -> JsResult<()> {
        let env = self.current_env();
        self.declare_binding(&env, name, BindingKind::Var)?;
        env.borrow_mut().initialize(name, value);
        Ok(())
    }

    /// Creates a binding in `env`. Re-declaring a `var` keeps its value; any
    /// clash involving a lexical binding is a SyntaxError.
    pub(crate) fn declare_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        kind: BindingKind,
    ) -> JsResult<()> {
        let existing = env.borrow().bindings.get(name).map(|b| b.kind);
        match existing {
            Some(old) if old.is_lexical() || kind.is_lexical() => Err(self.create_syntax_error(
                &format!("Identifier '{name}' has already been declared"),
            )),
            Some(_) => Ok(()),
            None => {
                env.borrow_mut().declare(name, kind);
                Ok(())
            }
        }
    }

    /// Initializes a binding created by [`Self::declare_binding`]; used for
    /// declarations, so `const` is accepted.
    pub(crate) fn initialize_binding(&mut self, env: &EnvRef, name: &str, value: JsValue) {
        if !env.borrow_mut().initialize(name, value) {
            panic!("initializing undeclared binding {name:?}");
        }
    }

    /// True if `name` resolves to something, without reading it.
    pub(crate) fn has_binding(&self, env: &EnvRef, name: &str) -> bool {
        let mut current = Some(env.clone());
        while let Some(e) = current {
            let b = e.borrow();
            if b.bindings.contains_key(name) {
                return true;
            }
            if let ScopeKind::Global(global) = b.scope {
                return self.has_property(&global, name);
            }
            current = b.parent.clone();
        }
        false
    }

    /// Resolves and reads an identifier.
    pub fn get_binding(&mut self, env: &EnvRef, name: &str) -> JsResult<JsValue> {
        let mut current = Some(env.clone());
        while let Some(e) = current.take() {
            let global = {
                let b = e.borrow();
                if let Some(binding) = b.bindings.get(name) {
                    if binding.initialized {
                        return Ok(binding.value.clone());
                    }
                    drop(b);
                    return Err(self.create_reference_error(&format!(
                        "Cannot access '{name}' before initialization"
                    )));
                }
                match b.scope {
                    ScopeKind::Global(global) => Some(global),
                    _ => {
                        current = b.parent.clone();
                        None
                    }
                }
            };
            if let Some(global) = global {
                if self.has_property(&global, name) {
                    return self.get(&global, name);
                }
                break;
            }
        }
        Err(self.create_reference_error(&format!("{name} is not defined")))
    }

    /// Resolves and assigns an identifier.
    pub fn set_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> JsResult<()> {
        let mut current = Some(env.clone());
        while let Some(e) = current.take() {
            let global = {
                let mut b = e.borrow_mut();
                if let Some(binding) = b.bindings.get_mut(name) {
                    if !binding.initialized {
                        drop(b);
                        return Err(self.create_reference_error(&format!(
                            "Cannot access '{name}' before initialization"
                        )));
                    }
                    if binding.kind == BindingKind::Const {
                        drop(b);
                        return Err(self.create_type_error("Assignment to constant variable."));
                    }
                    binding.value = value;
                    return Ok(());
                }
                match b.scope {
                    ScopeKind::Global(global) => Some(global),
                    _ => {
                        current = b.parent.clone();
                        None
                    }
                }
            };
            if let Some(global) = global {
                let target = JsValue::Object(global);
                if self.has_property(&global, name) {
                    return self.put(&target, name.into_property_key(), value, strict);
                }
                if !strict && self.config.implicit_globals {
                    self.create_data_property(&global, name, value)?;
                    return Ok(());
                }
                break;
            }
        }
        Err(self.create_reference_error(&format!("{name} is not defined")))
    }

    /// The nearest function environment that provides `this` (arrows are
    /// skipped). `None` at global level.
    pub(crate) fn this_environment(&self, env: &EnvRef) -> Option<EnvRef> {
        let mut current = Some(env.clone());
        while let Some(e) = current {
            let next = {
                let b = e.borrow();
                match &b.scope {
                    ScopeKind::Function(f) if !matches!(f.this, ThisBinding::Lexical) => {
                        None
                    }
                    ScopeKind::Global(_) => return None,
                    _ => Some(b.parent.clone()),
                }
            };
            match next {
                None => return Some(e),
                Some(parent) => current = parent,
            }
        }
        None
    }

    pub(crate) fn resolve_this(&mut self, env: &EnvRef) -> JsResult<JsValue> {
        let Some(this_env) = self.this_environment(env) else {
            return Ok(JsValue::Object(self.intrinsics.global_object));
        };
        let this = this_env.borrow().function_scope().map(|f| f.this.clone());
        match this {
            Some(ThisBinding::Initialized(v)) => Ok(v),
            Some(ThisBinding::Uninitialized) => Err(self.create_type_error(
                "Must call super constructor in derived class before accessing 'this'",
            )),
            _ => Ok(JsValue::Undefined),
        }
    }

    /// Binds `this` after `super()` returns.
    pub(crate) fn bind_this(&mut self, env: &EnvRef, value: JsValue) -> JsResult<()> {
        let Some(this_env) = self.this_environment(env) else {
            return Err(self.create_syntax_error("'super' keyword unexpected here"));
        };
        let mut b = this_env.borrow_mut();
        let Some(scope) = b.function_scope_mut() else {
            return Ok(());
        };
        if matches!(scope.this, ThisBinding::Initialized(_)) {
            drop(b);
            return Err(self.create_reference_error("Super constructor may only be called once"));
        }
        scope.this = ThisBinding::Initialized(value);
        Ok(())
    }

    pub(crate) fn resolve_new_target(&self, env: &EnvRef) -> JsValue {
        self.this_environment(env)
            .and_then(|e| e.borrow().function_scope().map(|f| f.new_target.clone()))
            .unwrap_or(JsValue::Undefined)
    }

    pub(crate) fn resolve_home_object(&self, env: &EnvRef) -> Option<JsObject> {
        self.this_environment(env)
            .and_then(|e| e.borrow().function_scope().and_then(|f| f.home_object))
    }

    pub(crate) fn resolve_active_function(&self, env: &EnvRef) -> Option<JsObject> {
        self.this_environment(env)
            .and_then(|e| e.borrow().function_scope().and_then(|f| f.function))
    }

    /// Base of `super.x`: the home object's prototype.
    pub(crate) fn super_base(&mut self, env: &EnvRef) -> JsResult<JsValue> {
        let Some(home) = self.resolve_home_object(env) else {
            return Err(self.create_syntax_error("'super' keyword unexpected here"));
        };
        Ok(match self.get_prototype_of(&home) {
            Some(proto) => JsValue::Object(proto),
            None => JsValue::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_walks_outward_and_shadows() {
        let mut interp = Interpreter::new();
        let global = interp.global_env();
        interp.declare_binding(&global, "x", BindingKind::Var).unwrap();
        interp.initialize_binding(&global, "x", JsValue::Number(1.0));
        let inner = Environment::new(Some(global.clone()));
        assert_eq!(interp.get_binding(&inner, "x").unwrap().as_number(), Some(1.0));
        interp.declare_binding(&inner, "x", BindingKind::Let).unwrap();
        interp.initialize_binding(&inner, "x", JsValue::Number(2.0));
        assert_eq!(interp.get_binding(&inner, "x").unwrap().as_number(), Some(2.0));
        assert_eq!(interp.get_binding(&global, "x").unwrap().as_number(), Some(1.0));
    }

    #[test]
    fn tdz_and_const_errors() {
        let mut interp = Interpreter::new();
        let env = Environment::new(Some(interp.global_env()));
        interp.declare_binding(&env, "a", BindingKind::Let).unwrap();
        let err = interp.get_binding(&env, "a").unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "ReferenceError: Cannot access 'a' before initialization"
        );
        interp.declare_binding(&env, "c", BindingKind::Const).unwrap();
        interp.initialize_binding(&env, "c", JsValue::Number(1.0));
        let err = interp.set_binding(&env, "c", JsValue::Null, false).unwrap_err();
        assert_eq!(interp.format_value(&err), "TypeError: Assignment to constant variable.");
        let err = interp.declare_binding(&env, "c", BindingKind::Let).unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "SyntaxError: Identifier 'c' has already been declared"
        );
    }

    #[test]
    fn undeclared_names() {
        let mut interp = Interpreter::new();
        let env = interp.global_env();
        let err = interp.get_binding(&env, "nope").unwrap_err();
        assert_eq!(interp.format_value(&err), "ReferenceError: nope is not defined");
        assert!(interp.set_binding(&env, "nope", JsValue::Null, false).is_err());
        assert!(!interp.has_binding(&env, "nope"));

        let mut sloppy = Interpreter::with_config(EngineConfig::default().with_implicit_globals(true));
        let env = sloppy.global_env();
        sloppy.set_binding(&env, "made", JsValue::Number(3.0), false).unwrap();
        let global = sloppy.global_object();
        assert_eq!(sloppy.get(&global, "made").unwrap().as_number(), Some(3.0));
        assert!(sloppy.set_binding(&env, "other", JsValue::Null, true).is_err());
    }

    #[test]
    fn global_object_backs_the_global_scope() {
        let mut interp = Interpreter::new();
        let env = interp.global_env();
        assert!(interp.get_binding(&env, "undefined").unwrap().is_undefined());
        let global = interp.global_object();
        interp.create_data_property(&global, "g", JsValue::Number(4.0)).unwrap();
        assert_eq!(interp.get_binding(&env, "g").unwrap().as_number(), Some(4.0));
        interp.set_binding(&env, "g", JsValue::Number(5.0), true).unwrap();
        assert_eq!(interp.get(&global, "g").unwrap().as_number(), Some(5.0));
        let err = interp.set_binding(&env, "undefined", JsValue::Null, true).unwrap_err();
        assert!(interp.format_value(&err).starts_with("TypeError"));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut interp = Interpreter::with_config(EngineConfig::default().with_max_call_depth(2));
        let env = interp.global_env();
        interp.enter_context(env.clone(), "a").unwrap();
        interp.enter_context(env.clone(), "b").unwrap();
        let err = interp.enter_context(env.clone(), "c").unwrap_err();
        assert_eq!(interp.format_value(&err), "RangeError: Maximum call stack size exceeded");
        assert_eq!(interp.call_depth(), 2);
        interp.exit_context(&env);
        interp.exit_context(&env);
        assert_eq!(interp.call_depth(), 0);
    }

    #[test]
    #[should_panic(expected = "not on top")]
    fn exiting_the_wrong_context_is_a_fault() {
        let mut interp = Interpreter::new();
        let env = interp.global_env();
        interp.enter_context(env, "f").unwrap();
        let other = Environment::new(None);
        interp.exit_context(&other);
    }

    #[test]
    fn this_resolution() {
        let mut interp = Interpreter::new();
        let global = interp.global_env();
        let this = interp.resolve_this(&global).unwrap();
        assert_eq!(this.as_object(), Some(&interp.global_object()));

        let scope = FunctionScope {
            this: ThisBinding::Uninitialized,
            function: None,
            new_target: JsValue::Undefined,
            home_object: None,
        };
        let ctor_env = Environment::new_function(global.clone(), scope, true);
        let arrow_scope = FunctionScope {
            this: ThisBinding::Lexical,
            function: None,
            new_target: JsValue::Undefined,
            home_object: None,
        };
        let arrow_env = Environment::new_function(ctor_env.clone(), arrow_scope, true);
        let block = Environment::new(Some(arrow_env));
        let err = interp.resolve_this(&block).unwrap_err();
        assert!(interp.format_value(&err).contains("Must call super constructor"));

        interp.bind_this(&block, JsValue::Number(1.0)).unwrap();
        assert_eq!(interp.resolve_this(&block).unwrap().as_number(), Some(1.0));
        let err = interp.bind_this(&block, JsValue::Number(2.0)).unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "ReferenceError: Super constructor may only be called once"
        );
    }
}
