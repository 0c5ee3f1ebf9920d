use crate::ast::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::{
    JsObject, JsString, JsSymbol, JsValue, PropertyKey, PropertyKeyLike, WellKnownSymbol,
    bigint_ops, number_ops,
};
use std::cell::RefCell;
use std::rc::Rc;

mod types;
pub use types::*;

mod helpers;
pub use helpers::{is_strictly_equal, same_value, same_value_zero, to_boolean};
pub(crate) use helpers::*;

mod call;
mod class;
mod coerce;
mod context;
mod eval;
mod exec;
mod heap;
mod intrinsics;
mod iteration;
mod object;

pub use coerce::{Numeric, PreferredType};
pub use intrinsics::ErrorKind;
use class::MethodKind;
use context::ensure_sufficient_stack;
use exec::{BindingMode, bound_names, top_level_declared_names};
use heap::Heap;
use intrinsics::Intrinsics;
use iteration::IteratorRecord;

/// One active function invocation.
pub(crate) struct ExecutionContext {
    pub(crate) env: EnvRef,
    pub(crate) function_name: String,
}

pub struct Interpreter {
    heap: Heap,
    pub(crate) intrinsics: Intrinsics,
    global_env: EnvRef,
    contexts: Vec<ExecutionContext>,
    config: EngineConfig,
    next_symbol_id: u64,
    /// `new.target` for the native constructor currently running.
    new_target: Option<JsValue>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut heap = Heap::default();
        let mut next_symbol_id = 1;
        let intrinsics = Intrinsics::allocate(&mut heap, &mut next_symbol_id);
        let global_env = Environment::new_global(intrinsics.global_object, config.strict);
        let mut interp = Self {
            heap,
            intrinsics,
            global_env,
            contexts: Vec::new(),
            config,
            next_symbol_id,
            new_target: None,
        };
        interp.setup_globals();
        interp
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn global_env(&self) -> EnvRef {
        self.global_env.clone()
    }

    pub fn global_object(&self) -> JsObject {
        self.intrinsics.global_object
    }

    pub fn new_symbol(&mut self, description: Option<&str>) -> JsSymbol {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        JsSymbol {
            id,
            description: description.map(JsString::from_str),
        }
    }

    pub fn well_known_symbol(&self, which: WellKnownSymbol) -> JsSymbol {
        match which {
            WellKnownSymbol::HasInstance => self.intrinsics.symbol_has_instance.clone(),
            WellKnownSymbol::Iterator => self.intrinsics.symbol_iterator.clone(),
            WellKnownSymbol::ToPrimitive => self.intrinsics.symbol_to_primitive.clone(),
            WellKnownSymbol::ToStringTag => self.intrinsics.symbol_to_string_tag.clone(),
        }
    }

    /// Executes a script against the global environment.
    pub fn run(&mut self, program: &Program) -> Completion {
        let env = self.global_env.clone();
        let strict = self.config.strict || is_strict_mode_body(&program.body);
        let previous = std::mem::replace(&mut env.borrow_mut().strict, strict);
        let completion = self.exec_program(&program.body, &env);
        env.borrow_mut().strict = previous;
        completion
    }

    /// Runs a script and maps its completion onto a host-level result.
    pub fn evaluate(&mut self, program: &Program) -> Result<JsValue, EngineError> {
        match self.run(program) {
            Completion::Normal(v) | Completion::Return(v) => Ok(v),
            Completion::Throw(value) => {
                let message = self.format_value(&value);
                tracing::debug!(%message, "uncaught exception");
                Err(EngineError::Uncaught { message, value })
            }
            Completion::Break(_) => Err(EngineError::UnexpectedCompletion("break")),
            Completion::Continue(_) => Err(EngineError::UnexpectedCompletion("continue")),
        }
    }

    /// Host-side rendering of a value. Reads `name`/`message` of error-like
    /// objects without running user code.
    pub fn format_value(&self, val: &JsValue) -> String {
        let JsValue::Object(o) = val else {
            return match val {
                JsValue::String(s) => s.to_rust_string(),
                other => format!("{other}"),
            };
        };
        let obj = self.get_object(o);
        let name = self.peek_data_property(o, "name");
        let message = self.peek_data_property(o, "message");
        match (name, message) {
            (Some(JsValue::String(n)), Some(JsValue::String(m))) => {
                if m.is_empty() {
                    n.to_rust_string()
                } else if n.is_empty() {
                    m.to_rust_string()
                } else {
                    format!("{n}: {m}")
                }
            }
            (_, Some(JsValue::String(m))) => m.to_rust_string(),
            _ => {
                let class = obj.borrow().class_name();
                format!("[object {class}]")
            }
        }
    }

    fn peek_data_property(&self, obj: &JsObject, key: &str) -> Option<JsValue> {
        let key = key.into_property_key();
        let mut current = Some(self.get_object(obj));
        while let Some(o) = current {
            let b = o.borrow();
            if let Some(desc) = b.get_own_property(&key) {
                return desc.value().cloned();
            }
            current = b.prototype.clone();
        }
        None
    }

    /// Wraps a [`JsFunction`] in a function object with `length`, `name`
    /// and, for ordinary functions, a fresh `prototype`.
    pub fn create_function(&mut self, func: JsFunction) -> JsValue {
        let (name, length, wants_prototype) = match &func {
            JsFunction::User {
                name, params, kind, ..
            } => (
                name.clone(),
                expected_argument_count(params),
                *kind == FunctionKind::Normal,
            ),
            JsFunction::Native { name, arity, .. } => (name.clone(), *arity, false),
        };
        let proto = self.get_object(&self.intrinsics.function_prototype);
        let mut data = JsObjectData::new(Some(proto));
        data.callable = Some(func);
        data.insert_property(
            "length".into_property_key(),
            PropertyDescriptor::data(JsValue::Number(length as f64), false, false, true),
        );
        data.insert_property(
            "name".into_property_key(),
            PropertyDescriptor::data(JsValue::from(name), false, false, true),
        );
        let func_obj = self.allocate_object(data);
        if wants_prototype {
            let proto_obj = self.create_object();
            self.get_object(&proto_obj)
                .borrow_mut()
                .insert_builtin("constructor".into_property_key(), JsValue::Object(func_obj));
            self.get_object(&func_obj).borrow_mut().insert_property(
                "prototype".into_property_key(),
                PropertyDescriptor::data(JsValue::Object(proto_obj), true, false, false),
            );
        }
        JsValue::Object(func_obj)
    }

    pub(crate) fn create_native_function(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> JsValue {
        self.create_function(JsFunction::native(name, arity, f))
    }

    /// Overwrites the `name` of a freshly created anonymous function.
    /// Accessors pass `get`/`set` as prefix.
    pub(crate) fn set_function_name(&mut self, func: &JsValue, key: &PropertyKey, prefix: Option<&str>) {
        let JsValue::Object(o) = func else {
            return;
        };
        let name = match key {
            PropertyKey::String(s) => s.clone(),
            PropertyKey::Symbol(sym) => match &sym.description {
                Some(desc) => JsString::from_str(&format!("[{desc}]")),
                None => JsString::default(),
            },
        };
        let name = match prefix {
            Some(prefix) => JsString::from_str(&format!("{prefix} ")).concat(&name),
            None => name,
        };
        let data = self.get_object(o);
        let mut b = data.borrow_mut();
        if let Some(JsFunction::User { name: fn_name, .. }) = &mut b.callable {
            *fn_name = name.to_rust_string();
        }
        b.insert_property(
            "name".into_property_key(),
            PropertyDescriptor::data(JsValue::String(name), false, false, true),
        );
    }
}

/// Number of parameters before the first one with a default or rest.
fn expected_argument_count(params: &[Pattern]) -> usize {
    params
        .iter()
        .take_while(|p| !matches!(p, Pattern::Assign(..) | Pattern::Rest(_)))
        .count()
}

pub(crate) fn is_strict_mode_body(body: &[Statement]) -> bool {
    for stmt in body {
        if let Statement::Expression(Expression::Literal(Literal::String(s))) = stmt {
            if s == "use strict" {
                return true;
            }
        } else {
            break;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn evaluate_returns_last_expression_value() {
        let mut interp = Interpreter::new();
        let v = interp
            .evaluate(&program(vec![expr(binary(BinaryOp::Add, num(1.0), num(2.0)))]))
            .unwrap();
        assert_eq!(v.as_number(), Some(3.0));
    }

    #[test]
    fn uncaught_throw_becomes_engine_error() {
        let mut interp = Interpreter::new();
        let err = interp
            .evaluate(&program(vec![expr(ident("missing"))]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Uncaught ReferenceError: missing is not defined");
        assert!(err.thrown_value().is_some());
    }

    #[test]
    fn stray_break_is_reported() {
        let mut interp = Interpreter::new();
        let err = interp
            .evaluate(&program(vec![Statement::Break(None)]))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnexpectedCompletion("break")));
    }

    #[test]
    fn function_objects_carry_length_and_name() {
        let mut interp = Interpreter::new();
        let f = interp
            .evaluate(&program(vec![
                Statement::FunctionDeclaration(FunctionDecl {
                    name: "f".into(),
                    params: vec![
                        Pattern::Identifier("a".into()),
                        Pattern::Assign(Box::new(Pattern::Identifier("b".into())), Box::new(num(1.0))),
                        Pattern::Identifier("c".into()),
                    ],
                    body: vec![],
                }),
                expr(ident("f")),
            ]))
            .unwrap();
        let f = *f.as_object().unwrap();
        let len = interp.get_own_property(&f, "length").unwrap();
        assert_eq!(len.value().and_then(JsValue::as_number), Some(1.0));
        assert!(!len.writable() && !len.enumerable() && len.configurable());
        let name = interp.get(&f, "name").unwrap();
        assert_eq!(interp.format_value(&name), "f");
        let proto = interp.get(&f, "prototype").unwrap();
        let ctor = interp.get_v(&proto, "constructor").unwrap();
        assert!(same_value(&ctor, &JsValue::Object(f)));
    }

    #[test]
    fn use_strict_directive_only_affects_its_own_program() {
        let mut interp = Interpreter::with_config(EngineConfig::default().with_implicit_globals(true));
        let err = interp
            .evaluate(&program(vec![
                expr(string("use strict")),
                expr(assign(ident("leaked"), num(1.0))),
            ]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Uncaught ReferenceError: leaked is not defined");
        let v = interp
            .evaluate(&program(vec![expr(assign(ident("leaked"), num(2.0))), expr(ident("leaked"))]))
            .unwrap();
        assert_eq!(v.as_number(), Some(2.0));
    }

    #[test]
    fn symbols_are_unique() {
        let mut interp = Interpreter::new();
        let a = interp.new_symbol(Some("x"));
        let b = interp.new_symbol(Some("x"));
        assert_ne!(a, b);
        let it = interp.well_known_symbol(WellKnownSymbol::Iterator);
        assert_eq!(it.to_string(), "Symbol(Symbol.iterator)");
    }
}
