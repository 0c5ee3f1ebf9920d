use super::*;
use num_bigint::BigInt;

/// A resolved assignment target.
pub(crate) enum Reference {
    Binding(String),
    /// `this` is set only for `super.x`, whose lookup starts at `base` but
    /// reads and writes on behalf of the current `this`.
    Property {
        base: JsValue,
        key: PropertyKey,
        this: Option<JsValue>,
    },
}

/// Source rendering of a callee for "is not a function" messages.
fn callee_text(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Identifier(name) => Some(name.clone()),
        Expression::This => Some("this".to_string()),
        Expression::Member(obj, MemberProperty::Dot(name)) => {
            Some(format!("{}.{name}", callee_text(obj)?))
        }
        Expression::SuperMember(MemberProperty::Dot(name)) => Some(format!("super.{name}")),
        _ => None,
    }
}

fn number_operation(op: BinaryOp, x: f64, y: f64) -> f64 {
    match op {
        BinaryOp::Add => number_ops::add(x, y),
        BinaryOp::Sub => number_ops::subtract(x, y),
        BinaryOp::Mul => number_ops::multiply(x, y),
        BinaryOp::Div => number_ops::divide(x, y),
        BinaryOp::Mod => number_ops::remainder(x, y),
        BinaryOp::Exp => number_ops::exponentiate(x, y),
        BinaryOp::LShift => number_ops::left_shift(x, y),
        BinaryOp::RShift => number_ops::signed_right_shift(x, y),
        BinaryOp::URShift => number_ops::unsigned_right_shift(x, y),
        BinaryOp::BitAnd => number_ops::bitwise_and(x, y),
        BinaryOp::BitOr => number_ops::bitwise_or(x, y),
        BinaryOp::BitXor => number_ops::bitwise_xor(x, y),
        other => unreachable!("{other:?} is not a numeric operator"),
    }
}

fn bigint_operation(op: BinaryOp, x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
    Ok(match op {
        BinaryOp::Add => bigint_ops::add(x, y),
        BinaryOp::Sub => bigint_ops::subtract(x, y),
        BinaryOp::Mul => bigint_ops::multiply(x, y),
        BinaryOp::Div => return bigint_ops::divide(x, y),
        BinaryOp::Mod => return bigint_ops::remainder(x, y),
        BinaryOp::Exp => return bigint_ops::exponentiate(x, y),
        BinaryOp::LShift => return bigint_ops::left_shift(x, y),
        BinaryOp::RShift => return bigint_ops::signed_right_shift(x, y),
        BinaryOp::URShift => return bigint_ops::unsigned_right_shift(x, y),
        BinaryOp::BitAnd => bigint_ops::bitwise_and(x, y),
        BinaryOp::BitOr => bigint_ops::bitwise_or(x, y),
        BinaryOp::BitXor => bigint_ops::bitwise_xor(x, y),
        other => unreachable!("{other:?} is not a numeric operator"),
    })
}

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expression, env: &EnvRef) -> Completion {
        self.eval_value(expr, env).into()
    }

    pub(crate) fn eval_value(&mut self, expr: &Expression, env: &EnvRef) -> JsResult<JsValue> {
        ensure_sufficient_stack(|| self.eval_value_inner(expr, env))
    }

    fn eval_value_inner(&mut self, expr: &Expression, env: &EnvRef) -> JsResult<JsValue> {
        match expr {
            Expression::Literal(lit) => self.eval_literal(lit),
            Expression::Identifier(name) => self.get_binding(env, name),
            Expression::This => self.resolve_this(env),
            Expression::Array(elements) => self.eval_array_literal(elements, env),
            Expression::Object(props) => self.eval_object_literal(props, env),
            Expression::Function(f) => Ok(self.eval_function_expression(f, env)),
            Expression::ArrowFunction(arrow) => {
                let body = match &arrow.body {
                    ArrowBody::Block(body) => body.clone(),
                    ArrowBody::Expression(e) => vec![Statement::Return(Some(e.as_ref().clone()))],
                };
                Ok(self.instantiate_function("", &arrow.params, body, env, FunctionKind::Arrow, None))
            }
            Expression::Class(class) => self.eval_class(
                class.name.as_deref(),
                class.super_class.as_deref(),
                &class.body,
                env,
            ),
            Expression::Unary(op, operand) => {
                let value = self.eval_value(operand, env)?;
                self.apply_unary_operator(*op, &value)
            }
            Expression::Binary(op, left, right) => {
                let left = self.eval_value(left, env)?;
                let right = self.eval_value(right, env)?;
                self.apply_binary_operator(*op, &left, &right)
            }
            Expression::Logical(op, left, right) => {
                let left = self.eval_value(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !to_boolean(&left),
                    LogicalOp::Or => to_boolean(&left),
                    LogicalOp::NullishCoalescing => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval_value(right, env)
                }
            }
            Expression::Update(op, prefix, target) => self.eval_update(*op, *prefix, target, env),
            Expression::Assign(op, target, value) => self.eval_assign(*op, target, value, env),
            Expression::DestructuringAssign(pattern, value) => {
                let value = self.eval_value(value, env)?;
                self.bind_pattern(pattern, value.clone(), BindingMode::Assign, env)?;
                Ok(value)
            }
            Expression::Conditional(test, consequent, alternate) => {
                let test = self.eval_value(test, env)?;
                if to_boolean(&test) {
                    self.eval_value(consequent, env)
                } else {
                    self.eval_value(alternate, env)
                }
            }
            Expression::Call(callee, args) => self.eval_call(callee, args, env),
            Expression::New(callee, args) => self.eval_new(callee, args, env),
            Expression::Member(obj, prop) => {
                let base = self.eval_value(obj, env)?;
                let key = self.eval_member_key(prop, env)?;
                self.get_v(&base, key)
            }
            Expression::OptionalChain(inner) => {
                Ok(self.eval_optional(inner, env)?.map_or(JsValue::Undefined, |(v, _)| v))
            }
            Expression::OptionalMember(..) | Expression::OptionalCall(..) => {
                Ok(self.eval_optional(expr, env)?.map_or(JsValue::Undefined, |(v, _)| v))
            }
            Expression::Spread(_) => Err(self.create_syntax_error("Unexpected token '...'")),
            Expression::Template(template) => {
                let mut out = JsString::default();
                for (i, quasi) in template.quasis.iter().enumerate() {
                    out = out.concat(&JsString::from_str(quasi));
                    if let Some(e) = template.expressions.get(i) {
                        let value = self.eval_value(e, env)?;
                        out = out.concat(&self.to_js_string(&value)?);
                    }
                }
                Ok(JsValue::String(out))
            }
            Expression::Typeof(operand) => {
                if let Expression::Identifier(name) = operand.as_ref()
                    && !self.has_binding(env, name)
                {
                    return Ok(JsValue::from("undefined"));
                }
                let value = self.eval_value(operand, env)?;
                Ok(JsValue::from(self.typeof_value(&value)))
            }
            Expression::Void(operand) => {
                self.eval_value(operand, env)?;
                Ok(JsValue::Undefined)
            }
            Expression::Delete(operand) => self.eval_delete(operand, env),
            Expression::Sequence(exprs) => {
                let mut last = JsValue::Undefined;
                for e in exprs {
                    last = self.eval_value(e, env)?;
                }
                Ok(last)
            }
            Expression::SuperCall(args) => {
                let args = self.eval_arguments(args, env)?;
                self.super_call(env, &args)
            }
            Expression::SuperMember(_) => {
                let reference = self.eval_reference(expr, env)?;
                self.get_reference_value(&reference, env)
            }
            Expression::NewTarget => Ok(self.resolve_new_target(env)),
        }
    }

    /// Evaluates the right-hand side of a binding to `name`; anonymous
    /// functions and classes take that name.
    pub(crate) fn eval_named(&mut self, expr: &Expression, name: &str, env: &EnvRef) -> JsResult<JsValue> {
        let value = self.eval_value(expr, env)?;
        if expr.is_anonymous_function_definition() {
            self.set_function_name(&value, &name.into_property_key(), None);
        }
        Ok(value)
    }

    fn eval_literal(&mut self, lit: &Literal) -> JsResult<JsValue> {
        Ok(match lit {
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::from(s.as_str()),
            Literal::BigInt(digits) => match string_to_bigint(&JsString::from_str(digits)) {
                Some(b) if !digits.trim().is_empty() => JsValue::from(b),
                _ => {
                    return Err(self.create_syntax_error(&format!("Invalid BigInt literal {digits}")));
                }
            },
        })
    }

    /// A named function expression sees itself through an immutable
    /// binding in a scope of its own.
    fn eval_function_expression(&mut self, f: &FunctionExpr, env: &EnvRef) -> JsValue {
        match f.name.as_deref() {
            Some(name) if !name.is_empty() => {
                let scope = Environment::new(Some(env.clone()));
                scope.borrow_mut().declare(name, BindingKind::Const);
                let func = self.instantiate_function(
                    name,
                    &f.params,
                    f.body.clone(),
                    &scope,
                    FunctionKind::Normal,
                    None,
                );
                scope.borrow_mut().initialize(name, func.clone());
                func
            }
            _ => self.instantiate_function("", &f.params, f.body.clone(), env, FunctionKind::Normal, None),
        }
    }

    pub(crate) fn eval_property_name(&mut self, name: &PropertyName, env: &EnvRef) -> JsResult<PropertyKey> {
        match name {
            PropertyName::Identifier(s) | PropertyName::String(s) => Ok(s.into_property_key()),
            PropertyName::Number(n) => Ok(number_ops::to_string(*n).into_property_key()),
            PropertyName::Computed(e) => {
                let value = self.eval_value(e, env)?;
                self.to_property_key(&value)
            }
        }
    }

    fn eval_member_key(&mut self, prop: &MemberProperty, env: &EnvRef) -> JsResult<PropertyKey> {
        match prop {
            MemberProperty::Dot(name) => Ok(name.into_property_key()),
            MemberProperty::Computed(e) => {
                let value = self.eval_value(e, env)?;
                self.to_property_key(&value)
            }
        }
    }

    pub(crate) fn eval_reference(&mut self, expr: &Expression, env: &EnvRef) -> JsResult<Reference> {
        match expr {
            Expression::Identifier(name) => Ok(Reference::Binding(name.clone())),
            Expression::Member(obj, prop) => {
                let base = self.eval_value(obj, env)?;
                let key = self.eval_member_key(prop, env)?;
                Ok(Reference::Property { base, key, this: None })
            }
            Expression::SuperMember(prop) => {
                let this = self.resolve_this(env)?;
                let key = self.eval_member_key(prop, env)?;
                let base = self.super_base(env)?;
                Ok(Reference::Property {
                    base,
                    key,
                    this: Some(this),
                })
            }
            _ => Err(self.create_syntax_error("Invalid left-hand side in assignment")),
        }
    }

    pub(crate) fn get_reference_value(&mut self, reference: &Reference, env: &EnvRef) -> JsResult<JsValue> {
        match reference {
            Reference::Binding(name) => self.get_binding(env, name),
            Reference::Property {
                base: JsValue::Object(o),
                key,
                this: Some(this),
            } => self.get_with_receiver(o, key, this),
            Reference::Property { base, key, .. } => self.get_v(base, key),
        }
    }

    pub(crate) fn put_value(&mut self, reference: &Reference, value: JsValue, env: &EnvRef) -> JsResult<()> {
        let strict = env.borrow().strict;
        match reference {
            Reference::Binding(name) => self.set_binding(env, name, value, strict),
            Reference::Property {
                base: JsValue::Object(o),
                key,
                this: Some(this),
            } => {
                if !self.set(o, key, value, this)? && strict {
                    return Err(self.create_type_error(&format!(
                        "Cannot assign to read only property '{key}' of object"
                    )));
                }
                Ok(())
            }
            Reference::Property { base, key, .. } => self.put(base, key.clone(), value, strict),
        }
    }

    fn apply_unary_operator(&mut self, op: UnaryOp, value: &JsValue) -> JsResult<JsValue> {
        Ok(match op {
            UnaryOp::Not => JsValue::Boolean(!to_boolean(value)),
            UnaryOp::Plus => JsValue::Number(self.to_number(value)?),
            UnaryOp::Minus => match self.to_numeric(value)? {
                Numeric::Number(n) => JsValue::Number(number_ops::unary_minus(n)),
                Numeric::BigInt(b) => JsValue::from(bigint_ops::unary_minus(&b)),
            },
            UnaryOp::BitNot => match self.to_numeric(value)? {
                Numeric::Number(n) => JsValue::Number(number_ops::bitwise_not(n)),
                Numeric::BigInt(b) => JsValue::from(bigint_ops::bitwise_not(&b)),
            },
        })
    }

    /// The binary operators, applied to already evaluated operands.
    pub(crate) fn apply_binary_operator(
        &mut self,
        op: BinaryOp,
        left: &JsValue,
        right: &JsValue,
    ) -> JsResult<JsValue> {
        match op {
            BinaryOp::Add => {
                let lprim = self.to_primitive(left, PreferredType::Default)?;
                let rprim = self.to_primitive(right, PreferredType::Default)?;
                if lprim.is_string() || rprim.is_string() {
                    let ls = self.to_js_string(&lprim)?;
                    let rs = self.to_js_string(&rprim)?;
                    if ls.len() + rs.len() > JsString::MAX_LENGTH {
                        return Err(self.create_range_error("Invalid string length"));
                    }
                    return Ok(JsValue::String(ls.concat(&rs)));
                }
                self.numeric_operation(op, &lprim, &rprim)
            }
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp
            | BinaryOp::LShift
            | BinaryOp::RShift
            | BinaryOp::URShift
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => self.numeric_operation(op, left, right),
            BinaryOp::Eq => Ok(JsValue::Boolean(self.is_loosely_equal(left, right)?)),
            BinaryOp::NotEq => Ok(JsValue::Boolean(!self.is_loosely_equal(left, right)?)),
            BinaryOp::StrictEq => Ok(JsValue::Boolean(is_strictly_equal(left, right))),
            BinaryOp::StrictNotEq => Ok(JsValue::Boolean(!is_strictly_equal(left, right))),
            BinaryOp::Lt => {
                let r = self.is_less_than(left, right, true)?;
                Ok(JsValue::Boolean(r == Some(true)))
            }
            BinaryOp::Gt => {
                let r = self.is_less_than(right, left, false)?;
                Ok(JsValue::Boolean(r == Some(true)))
            }
            BinaryOp::LtEq => {
                let r = self.is_less_than(right, left, false)?;
                Ok(JsValue::Boolean(r == Some(false)))
            }
            BinaryOp::GtEq => {
                let r = self.is_less_than(left, right, true)?;
                Ok(JsValue::Boolean(r == Some(false)))
            }
            BinaryOp::In => {
                let JsValue::Object(target) = right else {
                    let key = match left {
                        JsValue::String(s) => s.to_rust_string(),
                        other => other.to_string(),
                    };
                    let shown = describe_value(right);
                    return Err(self.create_type_error(&format!(
                        "Cannot use 'in' operator to search for '{key}' in {shown}"
                    )));
                };
                let key = self.to_property_key(left)?;
                Ok(JsValue::Boolean(self.has_property(target, key)))
            }
            BinaryOp::Instanceof => Ok(JsValue::Boolean(self.instance_of(left, right)?)),
        }
    }

    fn numeric_operation(&mut self, op: BinaryOp, left: &JsValue, right: &JsValue) -> JsResult<JsValue> {
        let l = self.to_numeric(left)?;
        let r = self.to_numeric(right)?;
        match (l, r) {
            (Numeric::Number(x), Numeric::Number(y)) => Ok(JsValue::Number(number_operation(op, x, y))),
            (Numeric::BigInt(x), Numeric::BigInt(y)) => match bigint_operation(op, &x, &y) {
                Ok(v) => Ok(JsValue::from(v)),
                Err(msg) if op == BinaryOp::URShift => Err(self.create_type_error(msg)),
                Err(msg) => Err(self.create_range_error(msg)),
            },
            _ => Err(self.create_type_error(
                "Cannot mix BigInt and other types, use explicit conversions",
            )),
        }
    }

    fn eval_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        target: &Expression,
        env: &EnvRef,
    ) -> JsResult<JsValue> {
        let reference = self.eval_reference(target, env)?;
        let old = self.get_reference_value(&reference, env)?;
        let old = self.to_numeric(&old)?;
        let new = match (&old, op) {
            (Numeric::Number(n), UpdateOp::Increment) => JsValue::Number(n + 1.0),
            (Numeric::Number(n), UpdateOp::Decrement) => JsValue::Number(n - 1.0),
            (Numeric::BigInt(b), UpdateOp::Increment) => {
                JsValue::from(bigint_ops::add(b, &BigInt::from(1)))
            }
            (Numeric::BigInt(b), UpdateOp::Decrement) => {
                JsValue::from(bigint_ops::subtract(b, &BigInt::from(1)))
            }
        };
        self.put_value(&reference, new.clone(), env)?;
        Ok(if prefix { new } else { old.into() })
    }

    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Expression,
        value: &Expression,
        env: &EnvRef,
    ) -> JsResult<JsValue> {
        let reference = self.eval_reference(target, env)?;
        let value = match (op, op.binary_op()) {
            (_, Some(binary)) => {
                let current = self.get_reference_value(&reference, env)?;
                let rhs = self.eval_value(value, env)?;
                self.apply_binary_operator(binary, &current, &rhs)?
            }
            (AssignOp::Assign, None) => self.eval_assigned_value(target, value, env)?,
            (_, None) => {
                let current = self.get_reference_value(&reference, env)?;
                let short_circuit = match op {
                    AssignOp::LogicalAndAssign => !to_boolean(&current),
                    AssignOp::LogicalOrAssign => to_boolean(&current),
                    _ => !current.is_nullish(),
                };
                if short_circuit {
                    return Ok(current);
                }
                self.eval_assigned_value(target, value, env)?
            }
        };
        self.put_value(&reference, value.clone(), env)?;
        Ok(value)
    }

    fn eval_assigned_value(&mut self, target: &Expression, value: &Expression, env: &EnvRef) -> JsResult<JsValue> {
        match target {
            Expression::Identifier(name) => self.eval_named(value, name, env),
            _ => self.eval_value(value, env),
        }
    }

    fn eval_delete(&mut self, operand: &Expression, env: &EnvRef) -> JsResult<JsValue> {
        match operand {
            Expression::Member(obj, prop) => {
                let base = self.eval_value(obj, env)?;
                let key = self.eval_member_key(prop, env)?;
                let target = self.to_object(&base)?;
                let deleted = self.delete_property(&target, key.clone());
                if !deleted && env.borrow().strict {
                    let shown = describe_value(&base);
                    return Err(self.create_type_error(&format!(
                        "Cannot delete property '{key}' of {shown}"
                    )));
                }
                Ok(JsValue::Boolean(deleted))
            }
            Expression::SuperMember(_) => {
                Err(self.create_reference_error("Unsupported reference to 'super'"))
            }
            Expression::Identifier(name) => Ok(JsValue::Boolean(self.delete_binding(env, name))),
            other => {
                self.eval_value(other, env)?;
                Ok(JsValue::Boolean(true))
            }
        }
    }

    /// `delete name`: declarative bindings stay, global object properties
    /// go through [[Delete]].
    fn delete_binding(&mut self, env: &EnvRef, name: &str) -> bool {
        let mut current = Some(env.clone());
        while let Some(e) = current {
            let b = e.borrow();
            if b.bindings.contains_key(name) {
                return false;
            }
            if let ScopeKind::Global(global) = b.scope {
                drop(b);
                return self.delete_property(&global, name);
            }
            current = b.parent.clone();
        }
        true
    }

    fn eval_arguments(&mut self, args: &[Expression], env: &EnvRef) -> JsResult<Vec<JsValue>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expression::Spread(inner) => {
                    let iterable = self.eval_value(inner, env)?;
                    values.extend(self.iterate_to_list(&iterable)?);
                }
                other => values.push(self.eval_value(other, env)?),
            }
        }
        Ok(values)
    }

    /// The function a call expression invokes and the `this` it gets.
    fn eval_callee(&mut self, callee: &Expression, env: &EnvRef) -> JsResult<(JsValue, JsValue)> {
        match callee {
            Expression::Member(obj, prop) => {
                let base = self.eval_value(obj, env)?;
                let key = self.eval_member_key(prop, env)?;
                let func = self.get_v(&base, key)?;
                Ok((func, base))
            }
            Expression::SuperMember(prop) => {
                let this = self.resolve_this(env)?;
                let key = self.eval_member_key(prop, env)?;
                let base = self.super_base(env)?;
                let func = match &base {
                    JsValue::Object(o) => self.get_with_receiver(o, key, &this)?,
                    other => self.get_v(other, key)?,
                };
                Ok((func, this))
            }
            Expression::OptionalChain(inner) => {
                Ok(self.eval_optional(inner, env)?.unwrap_or((JsValue::Undefined, JsValue::Undefined)))
            }
            other => Ok((self.eval_value(other, env)?, JsValue::Undefined)),
        }
    }

    fn eval_call(&mut self, callee: &Expression, args: &[Expression], env: &EnvRef) -> JsResult<JsValue> {
        let (func, this) = self.eval_callee(callee, env)?;
        let args = self.eval_arguments(args, env)?;
        self.call_checked(callee, &func, &this, &args)
    }

    fn call_checked(
        &mut self,
        callee: &Expression,
        func: &JsValue,
        this: &JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        if !self.is_callable(func) {
            let text = callee_text(callee).unwrap_or_else(|| describe_value(func));
            return Err(self.create_type_error(&format!("{text} is not a function")));
        }
        self.call(func, this, args)
    }

    fn eval_new(&mut self, callee: &Expression, args: &[Expression], env: &EnvRef) -> JsResult<JsValue> {
        let func = self.eval_value(callee, env)?;
        let args = self.eval_arguments(args, env)?;
        if !self.is_constructor(&func) {
            let text = callee_text(callee).unwrap_or_else(|| describe_value(&func));
            return Err(self.create_type_error(&format!("{text} is not a constructor")));
        }
        self.construct(&func, &args, None)
    }

    /// Evaluates the inside of an optional chain. `None` means a `?.`
    /// met a nullish value and the whole chain yields undefined. The
    /// second value is the `this` for a following call.
    fn eval_optional(&mut self, expr: &Expression, env: &EnvRef) -> JsResult<Option<(JsValue, JsValue)>> {
        match expr {
            Expression::OptionalMember(obj, prop) | Expression::Member(obj, prop) => {
                let Some((base, _)) = self.eval_optional(obj, env)? else {
                    return Ok(None);
                };
                if matches!(expr, Expression::OptionalMember(..)) && base.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval_member_key(prop, env)?;
                let value = self.get_v(&base, key)?;
                Ok(Some((value, base)))
            }
            Expression::OptionalCall(callee, args) | Expression::Call(callee, args) => {
                let Some((func, this)) = self.eval_optional(callee, env)? else {
                    return Ok(None);
                };
                if matches!(expr, Expression::OptionalCall(..)) && func.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_arguments(args, env)?;
                let value = self.call_checked(callee, &func, &this, &args)?;
                Ok(Some((value, JsValue::Undefined)))
            }
            other => self.eval_callee(other, env).map(Some),
        }
    }

    fn eval_array_literal(&mut self, elements: &[Option<Expression>], env: &EnvRef) -> JsResult<JsValue> {
        let mut slots = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                None => slots.push(None),
                Some(Expression::Spread(inner)) => {
                    let iterable = self.eval_value(inner, env)?;
                    for item in self.iterate_to_list(&iterable)? {
                        slots.push(Some(PropertyDescriptor::data_default(item)));
                    }
                }
                Some(e) => {
                    let value = self.eval_value(e, env)?;
                    slots.push(Some(PropertyDescriptor::data_default(value)));
                }
            }
        }
        let proto = self.intrinsics.array_prototype;
        let kind = ObjectKind::Array(ArrayElements::from_slots(slots));
        Ok(JsValue::Object(self.create_object_of_kind(&proto, kind)))
    }

    fn eval_object_literal(&mut self, props: &[Property], env: &EnvRef) -> JsResult<JsValue> {
        let obj = self.create_object();
        for prop in props {
            if let Expression::Spread(inner) = &prop.value {
                let source = self.eval_value(inner, env)?;
                self.copy_data_properties(&obj, &source, &[])?;
                continue;
            }
            let sets_prototype = prop.kind == PropertyKind::Init
                && !prop.method
                && !prop.shorthand
                && matches!(&prop.key, PropertyName::Identifier(k) | PropertyName::String(k) if k == "__proto__");
            let key = self.eval_property_name(&prop.key, env)?;
            let method_kind = match prop.kind {
                PropertyKind::Get => Some(MethodKind::Getter),
                PropertyKind::Set => Some(MethodKind::Setter),
                PropertyKind::Init if prop.method => Some(MethodKind::Method),
                PropertyKind::Init => None,
            };
            if let Some(kind) = method_kind {
                let Expression::Function(def) = &prop.value else {
                    return Err(self.create_syntax_error("Invalid method definition"));
                };
                self.define_method_property(&obj, key, def, kind, true, env)?;
                continue;
            }
            let value = self.eval_value(&prop.value, env)?;
            if sets_prototype {
                match &value {
                    JsValue::Object(proto) => {
                        self.set_prototype_of(&obj, Some(proto));
                    }
                    JsValue::Null => {
                        self.set_prototype_of(&obj, None);
                    }
                    _ => {}
                }
                continue;
            }
            if prop.value.is_anonymous_function_definition() {
                self.set_function_name(&value, &key, None);
            }
            self.create_data_property_or_throw(&obj, key, value)?;
        }
        Ok(JsValue::Object(obj))
    }

    /// CopyDataProperties: own enumerable properties of `source`, minus
    /// `excluded`, become data properties of `target`.
    pub(crate) fn copy_data_properties(
        &mut self,
        target: &JsObject,
        source: &JsValue,
        excluded: &[PropertyKey],
    ) -> JsResult<()> {
        if source.is_nullish() {
            return Ok(());
        }
        let from = self.to_object(source)?;
        for key in self.own_property_keys(&from) {
            if excluded.contains(&key) {
                continue;
            }
            if self.get_own_property(&from, &key).is_some_and(|d| d.enumerable()) {
                let value = self.get(&from, &key)?;
                self.create_data_property_or_throw(target, key, value)?;
            }
        }
        Ok(())
    }
}
