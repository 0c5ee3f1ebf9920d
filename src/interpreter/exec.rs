use super::*;

/// How [`Interpreter::bind_pattern`] stores the names a pattern binds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum BindingMode {
    /// Create the binding in the target environment and initialize it.
    Declare(BindingKind),
    /// Initialize a binding hoisted earlier (`let`, `const`).
    Initialize,
    /// Ordinary assignment through identifier resolution (`var`,
    /// destructuring assignment).
    Assign,
}

/// The names a binding pattern introduces, in source order.
pub(crate) fn bound_names(pattern: &Pattern, out: &mut Vec<String>) {
    match pattern {
        Pattern::Identifier(name) => out.push(name.clone()),
        Pattern::Array(elements) => {
            for element in elements.iter().flatten() {
                match element {
                    ArrayPatternElement::Pattern(p) | ArrayPatternElement::Rest(p) => {
                        bound_names(p, out);
                    }
                }
            }
        }
        Pattern::Object(props) => {
            for prop in props {
                match prop {
                    ObjectPatternProperty::KeyValue(_, p) | ObjectPatternProperty::Rest(p) => {
                        bound_names(p, out);
                    }
                    ObjectPatternProperty::Shorthand(name) => out.push(name.clone()),
                }
            }
        }
        Pattern::Assign(inner, _) | Pattern::Rest(inner) => bound_names(inner, out),
        Pattern::MemberExpression(_) => {}
    }
}

fn var_declaration_names(decl: &VariableDeclaration, out: &mut Vec<String>) {
    if decl.kind == VarKind::Var {
        for d in &decl.declarations {
            bound_names(&d.pattern, out);
        }
    }
}

/// `var` names declared anywhere in a body, not descending into nested
/// functions or classes.
fn collect_var_names(stmts: &[Statement], out: &mut Vec<String>) {
    for stmt in stmts {
        collect_var_names_in(stmt, out);
    }
}

fn collect_var_names_in(stmt: &Statement, out: &mut Vec<String>) {
    match stmt {
        Statement::Variable(decl) => var_declaration_names(decl, out),
        Statement::Block(body) => collect_var_names(body, out),
        Statement::If(s) => {
            collect_var_names_in(&s.consequent, out);
            if let Some(alt) = &s.alternate {
                collect_var_names_in(alt, out);
            }
        }
        Statement::While(s) => collect_var_names_in(&s.body, out),
        Statement::DoWhile(s) => collect_var_names_in(&s.body, out),
        Statement::For(s) => {
            if let Some(ForInit::Variable(decl)) = &s.init {
                var_declaration_names(decl, out);
            }
            collect_var_names_in(&s.body, out);
        }
        Statement::ForIn(s) => {
            if let ForInOfLeft::Variable(decl) = &s.left {
                var_declaration_names(decl, out);
            }
            collect_var_names_in(&s.body, out);
        }
        Statement::ForOf(s) => {
            if let ForInOfLeft::Variable(decl) = &s.left {
                var_declaration_names(decl, out);
            }
            collect_var_names_in(&s.body, out);
        }
        Statement::Try(s) => {
            collect_var_names(&s.block, out);
            if let Some(handler) = &s.handler {
                collect_var_names(&handler.body, out);
            }
            if let Some(finalizer) = &s.finalizer {
                collect_var_names(finalizer, out);
            }
        }
        Statement::Switch(s) => {
            for case in &s.cases {
                collect_var_names(&case.consequent, out);
            }
        }
        Statement::Labeled(_, inner) => collect_var_names_in(inner, out),
        _ => {}
    }
}

/// Names a statement list declares with `let`, `const`, `class` or a
/// function declaration at its top level.
pub(crate) fn top_level_declared_names(stmts: &[Statement]) -> Vec<String> {
    let mut out = Vec::new();
    for stmt in stmts {
        match stmt {
            Statement::Variable(decl) if decl.kind != VarKind::Var => {
                for d in &decl.declarations {
                    bound_names(&d.pattern, &mut out);
                }
            }
            Statement::ClassDeclaration(class) => out.push(class.name.clone()),
            Statement::FunctionDeclaration(f) => out.push(f.name.clone()),
            _ => {}
        }
    }
    out
}

/// Statements whose completion value can become the value of a list.
fn produces_value(stmt: &Statement) -> bool {
    !matches!(
        stmt,
        Statement::Empty
            | Statement::Variable(_)
            | Statement::FunctionDeclaration(_)
            | Statement::ClassDeclaration(_)
    )
}

/// Folds one loop-body completion into the loop. `None` keeps looping.
fn loop_exit(completion: Completion, labels: &[String], last: &mut JsValue) -> Option<Completion> {
    match completion {
        Completion::Normal(v) => {
            *last = v;
            None
        }
        Completion::Continue(None) => None,
        Completion::Continue(Some(label)) if labels.contains(&label) => None,
        Completion::Break(None) => Some(Completion::Normal(last.clone())),
        Completion::Break(Some(label)) if labels.contains(&label) => {
            Some(Completion::Normal(last.clone()))
        }
        other => Some(other),
    }
}

impl Interpreter {
    pub(crate) fn exec_program(&mut self, body: &[Statement], env: &EnvRef) -> Completion {
        if let Err(e) = self.instantiate_var_scope(body, env) {
            return Completion::Throw(e);
        }
        self.exec_statements(body, env)
    }

    /// Declaration instantiation for a script or function body: `var`
    /// names from the whole body, plus the body's own lexical and function
    /// declarations.
    pub(crate) fn instantiate_var_scope(&mut self, body: &[Statement], env: &EnvRef) -> JsResult<()> {
        let mut names = Vec::new();
        collect_var_names(body, &mut names);
        for name in &names {
            self.declare_binding(env, name, BindingKind::Var)?;
        }
        self.instantiate_block_declarations(body, env, true)
    }

    /// Creates the TDZ bindings of a statement list and instantiates its
    /// function declarations.
    fn instantiate_block_declarations(
        &mut self,
        stmts: &[Statement],
        env: &EnvRef,
        functions_are_var: bool,
    ) -> JsResult<()> {
        for stmt in stmts {
            match stmt {
                Statement::Variable(decl) if decl.kind != VarKind::Var => {
                    let kind = if decl.kind == VarKind::Const {
                        BindingKind::Const
                    } else {
                        BindingKind::Let
                    };
                    let mut names = Vec::new();
                    for d in &decl.declarations {
                        bound_names(&d.pattern, &mut names);
                    }
                    for name in &names {
                        self.declare_binding(env, name, kind)?;
                    }
                }
                Statement::ClassDeclaration(class) => {
                    self.declare_binding(env, &class.name, BindingKind::Let)?;
                }
                _ => {}
            }
        }
        for stmt in stmts {
            if let Statement::FunctionDeclaration(f) = stmt {
                let kind = if functions_are_var {
                    BindingKind::Var
                } else {
                    BindingKind::Let
                };
                self.declare_binding(env, &f.name, kind)?;
                let func = self.instantiate_function(
                    &f.name,
                    &f.params,
                    f.body.clone(),
                    env,
                    FunctionKind::Normal,
                    None,
                );
                self.initialize_binding(env, &f.name, func);
            }
        }
        Ok(())
    }

    pub(crate) fn exec_statements(&mut self, stmts: &[Statement], env: &EnvRef) -> Completion {
        let mut last = JsValue::Undefined;
        for stmt in stmts {
            match self.exec_statement(stmt, env) {
                Completion::Normal(v) => {
                    if produces_value(stmt) {
                        last = v;
                    }
                }
                other => return other,
            }
        }
        Completion::Normal(last)
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Statement, env: &EnvRef) -> Completion {
        ensure_sufficient_stack(|| self.exec_labelled(stmt, env, &[]))
    }

    /// Executes `stmt` with the label set directly attached to it.
    fn exec_labelled(&mut self, stmt: &Statement, env: &EnvRef, labels: &[String]) -> Completion {
        match stmt {
            Statement::Empty | Statement::FunctionDeclaration(_) => {
                Completion::Normal(JsValue::Undefined)
            }
            Statement::Expression(e) => self.eval_expr(e, env),
            Statement::Block(body) => self.exec_block(body, env),
            Statement::Variable(decl) => self
                .exec_variable_declaration(decl, env)
                .map(|()| JsValue::Undefined)
                .into(),
            Statement::If(s) => {
                let test = match self.eval_value(&s.test, env) {
                    Ok(v) => to_boolean(&v),
                    Err(e) => return Completion::Throw(e),
                };
                if test {
                    self.exec_statement(&s.consequent, env)
                } else if let Some(alt) = &s.alternate {
                    self.exec_statement(alt, env)
                } else {
                    Completion::Normal(JsValue::Undefined)
                }
            }
            Statement::While(s) => self.exec_while(s, env, labels),
            Statement::DoWhile(s) => self.exec_do_while(s, env, labels),
            Statement::For(s) => self.exec_for(s, env, labels),
            Statement::ForIn(s) => self.exec_for_in(s, env, labels),
            Statement::ForOf(s) => self.exec_for_of(s, env, labels),
            Statement::Return(value) => match value {
                None => Completion::Return(JsValue::Undefined),
                Some(e) => match self.eval_value(e, env) {
                    Ok(v) => Completion::Return(v),
                    Err(err) => Completion::Throw(err),
                },
            },
            Statement::Break(label) => Completion::Break(label.clone()),
            Statement::Continue(label) => Completion::Continue(label.clone()),
            Statement::Throw(e) => match self.eval_value(e, env) {
                Ok(v) | Err(v) => Completion::Throw(v),
            },
            Statement::Try(s) => self.exec_try(s, env),
            Statement::Switch(s) => self.exec_switch(s, env),
            Statement::Labeled(label, inner) => {
                let mut nested = labels.to_vec();
                nested.push(label.clone());
                match self.exec_labelled(inner, env, &nested) {
                    Completion::Break(Some(l)) if l == *label => {
                        Completion::Normal(JsValue::Undefined)
                    }
                    other => other,
                }
            }
            Statement::ClassDeclaration(class) => {
                match self.eval_class(Some(&class.name), class.super_class.as_deref(), &class.body, env) {
                    Ok(ctor) => {
                        self.initialize_binding(env, &class.name, ctor);
                        Completion::Normal(JsValue::Undefined)
                    }
                    Err(e) => Completion::Throw(e),
                }
            }
        }
    }

    fn exec_block(&mut self, body: &[Statement], env: &EnvRef) -> Completion {
        let block_env = Environment::new(Some(env.clone()));
        if let Err(e) = self.instantiate_block_declarations(body, &block_env, false) {
            return Completion::Throw(e);
        }
        self.exec_statements(body, &block_env)
    }

    fn exec_variable_declaration(&mut self, decl: &VariableDeclaration, env: &EnvRef) -> JsResult<()> {
        for d in &decl.declarations {
            let value = match &d.init {
                None if decl.kind == VarKind::Var => continue,
                None => JsValue::Undefined,
                Some(init) => match &d.pattern {
                    Pattern::Identifier(name) => self.eval_named(init, name, env)?,
                    _ => self.eval_value(init, env)?,
                },
            };
            let mode = if decl.kind == VarKind::Var {
                BindingMode::Assign
            } else {
                BindingMode::Initialize
            };
            self.bind_pattern(&d.pattern, value, mode, env)?;
        }
        Ok(())
    }

    fn exec_while(&mut self, s: &WhileStatement, env: &EnvRef, labels: &[String]) -> Completion {
        let mut last = JsValue::Undefined;
        loop {
            match self.eval_value(&s.test, env) {
                Ok(v) if !to_boolean(&v) => break,
                Ok(_) => {}
                Err(e) => return Completion::Throw(e),
            }
            if let Some(done) = loop_exit(self.exec_statement(&s.body, env), labels, &mut last) {
                return done;
            }
        }
        Completion::Normal(last)
    }

    fn exec_do_while(&mut self, s: &DoWhileStatement, env: &EnvRef, labels: &[String]) -> Completion {
        let mut last = JsValue::Undefined;
        loop {
            if let Some(done) = loop_exit(self.exec_statement(&s.body, env), labels, &mut last) {
                return done;
            }
            match self.eval_value(&s.test, env) {
                Ok(v) if !to_boolean(&v) => break,
                Ok(_) => {}
                Err(e) => return Completion::Throw(e),
            }
        }
        Completion::Normal(last)
    }

    fn exec_for(&mut self, s: &ForStatement, env: &EnvRef, labels: &[String]) -> Completion {
        let mut loop_env = env.clone();
        let mut per_iteration = Vec::new();
        match &s.init {
            Some(ForInit::Variable(decl)) if decl.kind != VarKind::Var => {
                loop_env = Environment::new(Some(env.clone()));
                let kind = if decl.kind == VarKind::Const {
                    BindingKind::Const
                } else {
                    BindingKind::Let
                };
                let mut names = Vec::new();
                for d in &decl.declarations {
                    bound_names(&d.pattern, &mut names);
                }
                for name in &names {
                    if let Err(e) = self.declare_binding(&loop_env, name, kind) {
                        return Completion::Throw(e);
                    }
                }
                if let Err(e) = self.exec_variable_declaration(decl, &loop_env) {
                    return Completion::Throw(e);
                }
                if kind == BindingKind::Let {
                    per_iteration = names;
                }
            }
            Some(ForInit::Variable(decl)) => {
                if let Err(e) = self.exec_variable_declaration(decl, env) {
                    return Completion::Throw(e);
                }
            }
            Some(ForInit::Expression(e)) => {
                if let Err(err) = self.eval_value(e, env) {
                    return Completion::Throw(err);
                }
            }
            None => {}
        }

        let mut iteration_env = copy_iteration_env(&loop_env, env, &per_iteration);
        let mut last = JsValue::Undefined;
        loop {
            if let Some(test) = &s.test {
                match self.eval_value(test, &iteration_env) {
                    Ok(v) if !to_boolean(&v) => break,
                    Ok(_) => {}
                    Err(e) => return Completion::Throw(e),
                }
            }
            let completion = self.exec_statement(&s.body, &iteration_env);
            if let Some(done) = loop_exit(completion, labels, &mut last) {
                return done;
            }
            iteration_env = copy_iteration_env(&iteration_env, env, &per_iteration);
            if let Some(update) = &s.update
                && let Err(e) = self.eval_value(update, &iteration_env)
            {
                return Completion::Throw(e);
            }
        }
        Completion::Normal(last)
    }

    /// Binds the loop variable of a `for-in`/`for-of` iteration. Lexical
    /// declarations get a fresh environment per iteration.
    fn bind_for_target(&mut self, left: &ForInOfLeft, value: JsValue, env: &EnvRef) -> JsResult<EnvRef> {
        match left {
            ForInOfLeft::Variable(decl) if decl.kind != VarKind::Var => {
                let iteration_env = Environment::new(Some(env.clone()));
                let kind = if decl.kind == VarKind::Const {
                    BindingKind::Const
                } else {
                    BindingKind::Let
                };
                for d in &decl.declarations {
                    self.bind_pattern(&d.pattern, value.clone(), BindingMode::Declare(kind), &iteration_env)?;
                }
                Ok(iteration_env)
            }
            ForInOfLeft::Variable(decl) => {
                for d in &decl.declarations {
                    self.bind_pattern(&d.pattern, value.clone(), BindingMode::Assign, env)?;
                }
                Ok(env.clone())
            }
            ForInOfLeft::Pattern(pattern) => {
                self.bind_pattern(pattern, value, BindingMode::Assign, env)?;
                Ok(env.clone())
            }
        }
    }

    fn exec_for_in(&mut self, s: &ForInStatement, env: &EnvRef, labels: &[String]) -> Completion {
        let value = match self.eval_value(&s.right, env) {
            Ok(v) => v,
            Err(e) => return Completion::Throw(e),
        };
        if value.is_nullish() {
            return Completion::Normal(JsValue::Undefined);
        }
        let obj = match self.to_object(&value) {
            Ok(o) => o,
            Err(e) => return Completion::Throw(e),
        };
        let mut last = JsValue::Undefined;
        for key in self.enumerate_object_properties(&obj) {
            // keys deleted by an earlier iteration are skipped
            if !self.has_property(&obj, &key) {
                continue;
            }
            let iteration_env = match self.bind_for_target(&s.left, JsValue::String(key), env) {
                Ok(e) => e,
                Err(e) => return Completion::Throw(e),
            };
            let completion = self.exec_statement(&s.body, &iteration_env);
            if let Some(done) = loop_exit(completion, labels, &mut last) {
                return done;
            }
        }
        Completion::Normal(last)
    }

    fn exec_for_of(&mut self, s: &ForOfStatement, env: &EnvRef, labels: &[String]) -> Completion {
        let iterable = match self.eval_value(&s.right, env) {
            Ok(v) => v,
            Err(e) => return Completion::Throw(e),
        };
        let mut record = match self.get_iterator(&iterable) {
            Ok(r) => r,
            Err(e) => return Completion::Throw(e),
        };
        let mut last = JsValue::Undefined;
        loop {
            let value = match self.iterator_step(&mut record) {
                Ok(Some(v)) => v,
                Ok(None) => return Completion::Normal(last),
                Err(e) => return Completion::Throw(e),
            };
            let iteration_env = match self.bind_for_target(&s.left, value, env) {
                Ok(e) => e,
                Err(e) => return self.iterator_close(&record, Completion::Throw(e)),
            };
            let completion = self.exec_statement(&s.body, &iteration_env);
            if let Some(done) = loop_exit(completion, labels, &mut last) {
                return self.iterator_close(&record, done);
            }
        }
    }

    fn exec_try(&mut self, s: &TryStatement, env: &EnvRef) -> Completion {
        let result = match (self.exec_block(&s.block, env), &s.handler) {
            (Completion::Throw(thrown), Some(handler)) => {
                let catch_env = Environment::new(Some(env.clone()));
                let bound = match &handler.param {
                    Some(param) => self.bind_pattern(
                        param,
                        thrown,
                        BindingMode::Declare(BindingKind::Let),
                        &catch_env,
                    ),
                    None => Ok(()),
                };
                // the body shares the parameter's scope so redeclaring it clashes
                let declared = bound.and_then(|()| {
                    self.instantiate_block_declarations(&handler.body, &catch_env, false)
                });
                match declared {
                    Ok(()) => self.exec_statements(&handler.body, &catch_env),
                    Err(e) => Completion::Throw(e),
                }
            }
            (other, _) => other,
        };
        if let Some(finalizer) = &s.finalizer {
            let finally = self.exec_block(finalizer, env);
            if finally.is_abrupt() {
                return finally;
            }
        }
        result
    }

    fn exec_switch(&mut self, s: &SwitchStatement, env: &EnvRef) -> Completion {
        let discriminant = match self.eval_value(&s.discriminant, env) {
            Ok(v) => v,
            Err(e) => return Completion::Throw(e),
        };
        let block_env = Environment::new(Some(env.clone()));
        for case in &s.cases {
            if let Err(e) = self.instantiate_block_declarations(&case.consequent, &block_env, false) {
                return Completion::Throw(e);
            }
        }
        let mut start = None;
        for (i, case) in s.cases.iter().enumerate() {
            let Some(test) = &case.test else {
                continue;
            };
            match self.eval_value(test, &block_env) {
                Ok(v) if is_strictly_equal(&discriminant, &v) => {
                    start = Some(i);
                    break;
                }
                Ok(_) => {}
                Err(e) => return Completion::Throw(e),
            }
        }
        let Some(start) = start.or_else(|| s.cases.iter().position(|c| c.test.is_none())) else {
            return Completion::Normal(JsValue::Undefined);
        };
        let mut last = JsValue::Undefined;
        for case in &s.cases[start..] {
            match self.exec_statements(&case.consequent, &block_env) {
                Completion::Normal(v) => last = v,
                Completion::Break(None) => return Completion::Normal(last),
                other => return other,
            }
        }
        Completion::Normal(last)
    }

    /// Binds every name in `pattern` from `value`, destructuring through
    /// the iterator protocol and property reads.
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: JsValue,
        mode: BindingMode,
        env: &EnvRef,
    ) -> JsResult<()> {
        match pattern {
            Pattern::Identifier(name) => self.bind_name(name, value, mode, env),
            Pattern::MemberExpression(target) => {
                if mode != BindingMode::Assign {
                    return Err(self.create_syntax_error("Invalid destructuring assignment target"));
                }
                let reference = self.eval_reference(target, env)?;
                self.put_value(&reference, value, env)
            }
            Pattern::Assign(inner, default) => {
                let value = if value.is_undefined() {
                    match inner.as_ref() {
                        Pattern::Identifier(name) => self.eval_named(default, name, env)?,
                        _ => self.eval_value(default, env)?,
                    }
                } else {
                    value
                };
                self.bind_pattern(inner, value, mode, env)
            }
            Pattern::Rest(inner) => self.bind_pattern(inner, value, mode, env),
            Pattern::Array(elements) => {
                let mut record = self.get_iterator(&value)?;
                match self.bind_array_elements(elements, &mut record, mode, env) {
                    Err(e) if !record.done => {
                        self.iterator_close(&record, Completion::Throw(e)).into_value()?;
                        Ok(())
                    }
                    Err(e) => Err(e),
                    Ok(()) if !record.done => {
                        self.iterator_close(&record, Completion::Normal(JsValue::Undefined))
                            .into_value()?;
                        Ok(())
                    }
                    Ok(()) => Ok(()),
                }
            }
            Pattern::Object(props) => {
                if value.is_nullish() {
                    return Err(self.create_type_error(&format!(
                        "Cannot destructure '{value}' as it is {value}."
                    )));
                }
                let mut excluded = Vec::new();
                for prop in props {
                    match prop {
                        ObjectPatternProperty::Shorthand(name) => {
                            let key = name.into_property_key();
                            let v = self.get_v(&value, key.clone())?;
                            excluded.push(key);
                            self.bind_name(name, v, mode, env)?;
                        }
                        ObjectPatternProperty::KeyValue(name, target) => {
                            let key = self.eval_property_name(name, env)?;
                            let v = self.get_v(&value, key.clone())?;
                            excluded.push(key);
                            self.bind_pattern(target, v, mode, env)?;
                        }
                        ObjectPatternProperty::Rest(target) => {
                            let rest = self.create_object();
                            self.copy_data_properties(&rest, &value, &excluded)?;
                            self.bind_pattern(target, JsValue::Object(rest), mode, env)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn bind_array_elements(
        &mut self,
        elements: &[Option<ArrayPatternElement>],
        record: &mut IteratorRecord,
        mode: BindingMode,
        env: &EnvRef,
    ) -> JsResult<()> {
        for element in elements {
            match element {
                None => {
                    if !record.done {
                        self.iterator_step(record)?;
                    }
                }
                Some(ArrayPatternElement::Pattern(target)) => {
                    let v = if record.done {
                        JsValue::Undefined
                    } else {
                        self.iterator_step(record)?.unwrap_or(JsValue::Undefined)
                    };
                    self.bind_pattern(target, v, mode, env)?;
                }
                Some(ArrayPatternElement::Rest(target)) => {
                    let mut rest = Vec::new();
                    while !record.done {
                        if let Some(v) = self.iterator_step(record)? {
                            rest.push(v);
                        }
                    }
                    let rest = self.create_array(rest);
                    self.bind_pattern(target, rest, mode, env)?;
                }
            }
        }
        Ok(())
    }

    fn bind_name(&mut self, name: &str, value: JsValue, mode: BindingMode, env: &EnvRef) -> JsResult<()> {
        match mode {
            BindingMode::Declare(kind) => {
                self.declare_binding(env, name, kind)?;
                self.initialize_binding(env, name, value);
                Ok(())
            }
            BindingMode::Initialize => {
                self.initialize_binding(env, name, value);
                Ok(())
            }
            BindingMode::Assign => {
                let strict = env.borrow().strict;
                self.set_binding(env, name, value, strict)
            }
        }
    }
}

/// CreatePerIterationEnvironment: copies the loop's `let` bindings into a
/// fresh environment so closures from earlier iterations keep their values.
fn copy_iteration_env(current: &EnvRef, outer: &EnvRef, names: &[String]) -> EnvRef {
    if names.is_empty() {
        return current.clone();
    }
    let next = Environment::new(Some(outer.clone()));
    {
        let src = current.borrow();
        let mut dst = next.borrow_mut();
        for name in names {
            if let Some(binding) = src.bindings.get(name) {
                dst.bindings.insert(name.clone(), binding.clone());
            }
        }
    }
    next
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

    fn incr(name: &str) -> Statement {
        expr(update(UpdateOp::Increment, false, ident(name)))
    }

    fn for_let(name: &str, limit: f64, body: Statement) -> Statement {
        Statement::For(ForStatement {
            init: Some(ForInit::Variable(VariableDeclaration {
                kind: VarKind::Let,
                declarations: vec![VariableDeclarator {
                    pattern: Pattern::Identifier(name.into()),
                    init: Some(num(0.0)),
                }],
            })),
            test: Some(binary(BinaryOp::Lt, ident(name), num(limit))),
            update: Some(update(UpdateOp::Increment, false, ident(name))),
            body: Box::new(body),
        })
    }

    fn for_of(name: &str, right: Expression, body: Statement) -> Statement {
        Statement::ForOf(ForOfStatement {
            left: ForInOfLeft::Variable(VariableDeclaration {
                kind: VarKind::Const,
                declarations: vec![VariableDeclarator {
                    pattern: Pattern::Identifier(name.into()),
                    init: None,
                }],
            }),
            right,
            body: Box::new(body),
        })
    }

    #[test]
    fn throw_in_loop_runs_finally_then_rethrows() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                var("log", Some(string(""))),
                try_(
                    vec![try_(
                        vec![while_(boolean(true), throw(string("boom")))],
                        None,
                        Some(vec![expr(assign_op(AssignOp::AddAssign, ident("log"), string("finally;")))]),
                    )],
                    Some(("e", vec![expr(assign_op(AssignOp::AddAssign, ident("log"), ident("e")))])),
                    None,
                ),
                expr(ident("log")),
            ],
        );
        assert_eq!(interp.format_value(&v), "finally;boom");
    }

    #[test]
    fn return_survives_normal_finally_and_abrupt_finally_wins() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                var("n", Some(num(0.0))),
                function(
                    "f",
                    &[],
                    vec![try_(vec![ret(num(1.0))], None, Some(vec![incr("n")]))],
                ),
                expr(binary(BinaryOp::Add, call(ident("f"), vec![]), binary(BinaryOp::Mul, ident("n"), num(10.0)))),
            ],
        );
        assert_eq!(v.as_number(), Some(11.0));
        let v = eval(
            &mut interp,
            vec![
                function("g", &[], vec![try_(vec![ret(num(1.0))], None, Some(vec![ret(num(2.0))]))]),
                expr(call(ident("g"), vec![])),
            ],
        );
        assert_eq!(v.as_number(), Some(2.0));
        let v = eval(
            &mut interp,
            vec![
                function(
                    "h",
                    &[],
                    vec![while_(
                        boolean(true),
                        try_(vec![throw(num(1.0))], None, Some(vec![Statement::Break(None)])),
                    ), ret(string("swallowed"))],
                ),
                expr(call(ident("h"), vec![])),
            ],
        );
        assert_eq!(interp.format_value(&v), "swallowed");
    }

    #[test]
    fn closures_observe_later_assignment() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                let_("x", Some(num(1.0))),
                const_("get", arrow(&[], ident("x"))),
                expr(assign(ident("x"), num(2.0))),
                expr(call(ident("get"), vec![])),
            ],
        );
        assert_eq!(v.as_number(), Some(2.0));
    }

    #[test]
    fn let_loops_capture_per_iteration_bindings() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                const_("fns", array(vec![])),
                for_let(
                    "i",
                    3.0,
                    expr(call(member(ident("fns"), "push"), vec![arrow(&[], ident("i"))])),
                ),
                expr(binary(
                    BinaryOp::Add,
                    call(index(ident("fns"), num(0.0)), vec![]),
                    call(index(ident("fns"), num(2.0)), vec![]),
                )),
            ],
        );
        assert_eq!(v.as_number(), Some(2.0));
    }

    #[test]
    fn hoisting_and_tdz() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                expr(call(ident("early"), vec![])),
                function("early", &[], vec![ret(Expression::Typeof(Box::new(ident("later"))))]),
                var("later", Some(num(1.0))),
            ],
        );
        assert_eq!(interp.format_value(&v), "undefined");
        let msg = eval_err(&mut interp, vec![expr(ident("t")), let_("t", Some(num(1.0)))]);
        assert_eq!(msg, "ReferenceError: Cannot access 't' before initialization");
        let msg = eval_err(&mut interp, vec![var("d", None), let_("d", None)]);
        assert_eq!(msg, "SyntaxError: Identifier 'd' has already been declared");
    }

    #[test]
    fn block_scoping_shadows_outer_binding() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                let_("s", Some(num(1.0))),
                block(vec![let_("s", Some(num(2.0)))]),
                expr(ident("s")),
            ],
        );
        assert_eq!(v.as_number(), Some(1.0));
    }

    #[test]
    fn labeled_continue_and_break() {
        let mut interp = Interpreter::new();
        let inner = for_let(
            "j",
            3.0,
            block(vec![
                if_(
                    binary(BinaryOp::StrictEq, ident("j"), num(1.0)),
                    Statement::Continue(Some("outer".into())),
                    None,
                ),
                if_(
                    binary(BinaryOp::StrictEq, ident("i"), num(2.0)),
                    Statement::Break(Some("outer".into())),
                    None,
                ),
                incr("count"),
            ]),
        );
        let v = eval(
            &mut interp,
            vec![
                var("count", Some(num(0.0))),
                Statement::Labeled("outer".into(), Box::new(for_let("i", 5.0, inner))),
                expr(ident("count")),
            ],
        );
        assert_eq!(v.as_number(), Some(2.0));
        let v = eval(
            &mut interp,
            vec![
                Statement::Labeled(
                    "blk".into(),
                    Box::new(block(vec![Statement::Break(Some("blk".into())), incr("count")])),
                ),
                expr(ident("count")),
            ],
        );
        assert_eq!(v.as_number(), Some(2.0));
    }

    #[test]
    fn switch_falls_through_from_match_and_default() {
        let mut interp = Interpreter::new();
        let switch = |d: f64| {
            Statement::Switch(SwitchStatement {
                discriminant: num(d),
                cases: vec![
                    SwitchCase {
                        test: Some(num(1.0)),
                        consequent: vec![expr(assign_op(AssignOp::AddAssign, ident("out"), string("a")))],
                    },
                    SwitchCase {
                        test: None,
                        consequent: vec![expr(assign_op(AssignOp::AddAssign, ident("out"), string("d")))],
                    },
                    SwitchCase {
                        test: Some(num(2.0)),
                        consequent: vec![
                            expr(assign_op(AssignOp::AddAssign, ident("out"), string("b"))),
                            Statement::Break(None),
                        ],
                    },
                    SwitchCase {
                        test: Some(num(3.0)),
                        consequent: vec![expr(assign_op(AssignOp::AddAssign, ident("out"), string("c")))],
                    },
                ],
            })
        };
        let v = eval(
            &mut interp,
            vec![var("out", Some(string(""))), switch(1.0), switch(3.0), switch(9.0), expr(ident("out"))],
        );
        assert_eq!(interp.format_value(&v), "adbcdb");
    }

    #[test]
    fn for_in_visits_enumerable_chain_once() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                const_("proto", object(vec![("a", num(1.0)), ("b", num(2.0))])),
                const_("o", call(member(ident("Object"), "create"), vec![ident("proto")])),
                expr(assign(member(ident("o"), "b"), num(3.0))),
                expr(assign(member(ident("o"), "c"), num(4.0))),
                var("keys", Some(string(""))),
                Statement::ForIn(ForInStatement {
                    left: ForInOfLeft::Variable(VariableDeclaration {
                        kind: VarKind::Const,
                        declarations: vec![VariableDeclarator {
                            pattern: Pattern::Identifier("k".into()),
                            init: None,
                        }],
                    }),
                    right: ident("o"),
                    body: Box::new(expr(assign_op(AssignOp::AddAssign, ident("keys"), ident("k")))),
                }),
                Statement::ForIn(ForInStatement {
                    left: ForInOfLeft::Pattern(Pattern::Identifier("keys".into())),
                    right: null(),
                    body: Box::new(Statement::Empty),
                }),
                expr(ident("keys")),
            ],
        );
        assert_eq!(interp.format_value(&v), "bca");
    }

    #[test]
    fn for_of_closes_iterator_on_break() {
        let mut interp = Interpreter::new();
        let closed = Rc::new(std::cell::Cell::new(false));
        let flag = closed.clone();
        let ret_fn = interp.create_native_function("return", 0, move |interp, _, _| {
            flag.set(true);
            Completion::Normal(JsValue::Object(interp.create_object()))
        });
        interp.declare_variable("onReturn", ret_fn).unwrap();
        let v = eval(
            &mut interp,
            vec![
                const_("it", call(member(array(vec![num(1.0), num(2.0), num(3.0)]), "values"), vec![])),
                expr(assign(member(ident("it"), "return"), ident("onReturn"))),
                var("sum", Some(num(0.0))),
                for_of(
                    "x",
                    ident("it"),
                    block(vec![
                        expr(assign_op(AssignOp::AddAssign, ident("sum"), ident("x"))),
                        if_(binary(BinaryOp::StrictEq, ident("x"), num(2.0)), Statement::Break(None), None),
                    ]),
                ),
                expr(ident("sum")),
            ],
        );
        assert_eq!(v.as_number(), Some(3.0));
        assert!(closed.get());
    }

    #[test]
    fn destructuring_declarations() {
        let mut interp = Interpreter::new();
        let decl = Statement::Variable(VariableDeclaration {
            kind: VarKind::Let,
            declarations: vec![VariableDeclarator {
                pattern: Pattern::Object(vec![
                    ObjectPatternProperty::Shorthand("a".into()),
                    ObjectPatternProperty::KeyValue(
                        PropertyName::Identifier("b".into()),
                        Pattern::Array(vec![
                            None,
                            Some(ArrayPatternElement::Pattern(Pattern::Assign(
                                Box::new(Pattern::Identifier("second".into())),
                                Box::new(num(7.0)),
                            ))),
                            Some(ArrayPatternElement::Rest(Pattern::Identifier("more".into()))),
                        ]),
                    ),
                    ObjectPatternProperty::Rest(Pattern::Identifier("others".into())),
                ]),
                init: Some(object(vec![
                    ("a", num(1.0)),
                    ("b", array(vec![num(0.0)])),
                    ("c", num(3.0)),
                ])),
            }],
        });
        let v = eval(
            &mut interp,
            vec![
                decl,
                expr(binary(
                    BinaryOp::Add,
                    binary(BinaryOp::Add, ident("a"), ident("second")),
                    binary(BinaryOp::Add, member(ident("more"), "length"), member(ident("others"), "c")),
                )),
            ],
        );
        assert_eq!(v.as_number(), Some(11.0));
        let msg = eval_err(
            &mut interp,
            vec![Statement::Variable(VariableDeclaration {
                kind: VarKind::Const,
                declarations: vec![VariableDeclarator {
                    pattern: Pattern::Object(vec![ObjectPatternProperty::Shorthand("z".into())]),
                    init: Some(null()),
                }],
            })],
        );
        assert_eq!(msg, "TypeError: Cannot destructure 'null' as it is null.");
    }

    #[test]
    fn catch_binding_is_block_scoped() {
        let mut interp = Interpreter::new();
        let v = eval(
            &mut interp,
            vec![
                var("e", Some(string("outer"))),
                try_(vec![throw(string("inner"))], Some(("e", vec![])), None),
                expr(ident("e")),
            ],
        );
        assert_eq!(interp.format_value(&v), "outer");
    }

    #[test]
    fn catch_body_cannot_redeclare_the_parameter() {
        let mut interp = Interpreter::new();
        let err = interp
            .evaluate(&program(vec![try_(
                vec![throw(num(1.0))],
                Some(("e", vec![let_("e", None)])),
                None,
            )]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Uncaught SyntaxError: Identifier 'e' has already been declared");
        let v = eval(
            &mut interp,
            vec![
                var("seen", None),
                try_(
                    vec![throw(num(1.0))],
                    Some(("e", vec![let_("f", Some(ident("e"))), expr(assign(ident("seen"), ident("f")))])),
                    None,
                ),
                expr(ident("seen")),
            ],
        );
        assert_eq!(v.as_number(), Some(1.0));
    }
}
