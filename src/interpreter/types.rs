use crate::ast::{Expression, Pattern, Statement};
use crate::types::{JsObject, JsString, JsValue, PropertyKey};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type JsResult<T> = Result<T, JsValue>;

#[derive(Debug)]
pub enum Completion {
    Normal(JsValue),
    Return(JsValue),
    Throw(JsValue),
    Break(Option<String>),
    Continue(Option<String>),
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    /// Collapses an expression-level completion. Expressions only ever
    /// complete normally or by throwing.
    pub(crate) fn into_value(self) -> JsResult<JsValue> {
        match self {
            Completion::Normal(v) => Ok(v),
            Completion::Throw(e) => Err(e),
            other => unreachable!("{other:?} completion escaped an expression"),
        }
    }
}

impl From<JsResult<JsValue>> for Completion {
    fn from(result: JsResult<JsValue>) -> Self {
        match result {
            Ok(v) => Completion::Normal(v),
            Err(e) => Completion::Throw(e),
        }
    }
}

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug)]
pub struct Environment {
    pub(crate) bindings: FxHashMap<String, Binding>,
    pub(crate) parent: Option<EnvRef>,
    pub(crate) scope: ScopeKind,
    pub strict: bool,
}

#[derive(Debug)]
pub(crate) enum ScopeKind {
    /// Root scope; misses fall back to properties of the global object.
    Global(JsObject),
    Function(FunctionScope),
    Block,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionScope {
    pub(crate) this: ThisBinding,
    pub(crate) function: Option<JsObject>,
    pub(crate) new_target: JsValue,
    pub(crate) home_object: Option<JsObject>,
}

#[derive(Debug, Clone)]
pub(crate) enum ThisBinding {
    /// Arrow functions see the enclosing `this`.
    Lexical,
    /// Derived constructors before `super()` returns.
    Uninitialized,
    Initialized(JsValue),
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) value: JsValue,
    pub(crate) kind: BindingKind,
    pub(crate) initialized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
}

impl BindingKind {
    pub fn is_lexical(self) -> bool {
        !matches!(self, BindingKind::Var)
    }
}

impl Environment {
    pub fn new(parent: Option<EnvRef>) -> EnvRef {
        let strict = parent.as_ref().is_some_and(|p| p.borrow().strict);
        Rc::new(RefCell::new(Environment {
            bindings: FxHashMap::default(),
            parent,
            scope: ScopeKind::Block,
            strict,
        }))
    }

    pub(crate) fn new_global(global_object: JsObject, strict: bool) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            bindings: FxHashMap::default(),
            parent: None,
            scope: ScopeKind::Global(global_object),
            strict,
        }))
    }

    pub(crate) fn new_function(parent: EnvRef, scope: FunctionScope, strict: bool) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            bindings: FxHashMap::default(),
            parent: Some(parent),
            scope: ScopeKind::Function(scope),
            strict,
        }))
    }

    /// Creates (or re-creates) a binding in this environment. Lexical
    /// bindings start out uninitialized.
    pub fn declare(&mut self, name: &str, kind: BindingKind) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                value: JsValue::Undefined,
                kind,
                initialized: kind == BindingKind::Var,
            },
        );
    }

    pub fn has_own_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Sets the value of a binding owned by this environment and marks it
    /// initialized. Returns false if the name is not bound here.
    pub(crate) fn initialize(&mut self, name: &str, value: JsValue) -> bool {
        match self.bindings.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                binding.initialized = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_var_scope(&self) -> bool {
        !matches!(self.scope, ScopeKind::Block)
    }

    pub(crate) fn function_scope(&self) -> Option<&FunctionScope> {
        match &self.scope {
            ScopeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn function_scope_mut(&mut self) -> Option<&mut FunctionScope> {
        match &mut self.scope {
            ScopeKind::Function(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Normal,
    Arrow,
    /// Object-literal and class methods, getters and setters.
    Method,
    ClassConstructor {
        derived: bool,
    },
}

/// An instance field declared in a class body, with its key already
/// evaluated.
#[derive(Debug, Clone)]
pub struct ClassFieldDef {
    pub key: PropertyKey,
    pub initializer: Option<Expression>,
}

pub type NativeFn = Rc<dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion>;

#[derive(Clone)]
pub enum JsFunction {
    User {
        name: String,
        params: Rc<Vec<Pattern>>,
        body: Rc<Vec<Statement>>,
        closure: EnvRef,
        kind: FunctionKind,
        is_strict: bool,
        home_object: Option<JsObject>,
        fields: Rc<Vec<ClassFieldDef>>,
    },
    Native {
        name: String,
        arity: usize,
        func: NativeFn,
        constructor: bool,
    },
}

impl JsFunction {
    pub fn native(
        name: &str,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.to_string(),
            arity,
            func: Rc::new(f),
            constructor: false,
        }
    }

    /// A native that may also be invoked with `new`. The interpreter
    /// allocates the receiver from `new.target` and passes it as `this`.
    pub fn native_constructor(
        name: &str,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction::Native {
            name: name.to_string(),
            arity,
            func: Rc::new(f),
            constructor: true,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            JsFunction::User { name, .. } | JsFunction::Native { name, .. } => name,
        }
    }

    pub fn is_class_constructor(&self) -> bool {
        matches!(
            self,
            JsFunction::User {
                kind: FunctionKind::ClassConstructor { .. },
                ..
            }
        )
    }

    pub fn is_derived_constructor(&self) -> bool {
        matches!(
            self,
            JsFunction::User {
                kind: FunctionKind::ClassConstructor { derived: true },
                ..
            }
        )
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsFunction::User { name, kind, .. } => write!(f, "JsFunction::User({name:?}, {kind:?})"),
            JsFunction::Native { name, arity, .. } => {
                write!(f, "JsFunction::Native({name:?}, {arity})")
            }
        }
    }
}

/// Objects that can be the target of a call.
pub trait Callable {
    fn is_callable(&self) -> bool;
}

/// Objects that can be the target of `new`.
pub trait Constructable: Callable {
    fn is_constructor(&self) -> bool;
}

impl Callable for JsFunction {
    fn is_callable(&self) -> bool {
        true
    }
}

impl Constructable for JsFunction {
    fn is_constructor(&self) -> bool {
        match self {
            JsFunction::User { kind, .. } => {
                matches!(kind, FunctionKind::Normal | FunctionKind::ClassConstructor { .. })
            }
            JsFunction::Native { constructor, .. } => *constructor,
        }
    }
}

impl Callable for JsObjectData {
    fn is_callable(&self) -> bool {
        self.callable.is_some()
    }
}

impl Constructable for JsObjectData {
    fn is_constructor(&self) -> bool {
        self.callable.as_ref().is_some_and(|f| f.is_constructor())
    }
}

/// A complete property record: either a data property or an accessor pair.
#[derive(Debug, Clone)]
pub enum PropertyDescriptor {
    Data {
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<JsValue>,
        set: Option<JsValue>,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor::Data {
            value,
            writable,
            enumerable,
            configurable,
        }
    }

    /// Writable, enumerable, configurable: what plain assignment creates.
    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    /// Writable, non-enumerable, configurable: built-in methods.
    pub fn builtin(value: JsValue) -> Self {
        Self::data(value, true, false, true)
    }

    pub fn accessor(
        get: Option<JsValue>,
        set: Option<JsValue>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        PropertyDescriptor::Accessor {
            get,
            set,
            enumerable,
            configurable,
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        matches!(self, PropertyDescriptor::Data { .. })
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        matches!(self, PropertyDescriptor::Accessor { .. })
    }

    pub fn enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { enumerable, .. }
            | PropertyDescriptor::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { configurable, .. }
            | PropertyDescriptor::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn writable(&self) -> bool {
        matches!(self, PropertyDescriptor::Data { writable: true, .. })
    }

    /// The stored value of a data property.
    pub fn value(&self) -> Option<&JsValue> {
        match self {
            PropertyDescriptor::Data { value, .. } => Some(value),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }
}

/// A partial descriptor as accepted by `define_own_property`: absent fields
/// keep their current value (or take the default for a new property).
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptorPatch {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptorPatch {
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    pub fn value(value: JsValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }
}

impl From<PropertyDescriptor> for PropertyDescriptorPatch {
    fn from(desc: PropertyDescriptor) -> Self {
        match desc {
            PropertyDescriptor::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => Self {
                value: Some(value),
                writable: Some(writable),
                get: None,
                set: None,
                enumerable: Some(enumerable),
                configurable: Some(configurable),
            },
            PropertyDescriptor::Accessor {
                get,
                set,
                enumerable,
                configurable,
            } => Self {
                value: None,
                writable: None,
                get: Some(get.unwrap_or(JsValue::Undefined)),
                set: Some(set.unwrap_or(JsValue::Undefined)),
                enumerable: Some(enumerable),
                configurable: Some(configurable),
            },
        }
    }
}

/// Slots past the dense prefix that a write may fill in before it goes to
/// the sparse map instead.
const DENSE_GROWTH_LIMIT: usize = 1024;

/// Index properties of an array. Indices below `dense.len()` live in the
/// dense prefix (holes are `None`), everything above it in `sparse`.
/// `length` is tracked on its own so trailing holes cost nothing.
#[derive(Debug, Clone, Default)]
pub struct ArrayElements {
    dense: Vec<Option<PropertyDescriptor>>,
    sparse: FxHashMap<u32, PropertyDescriptor>,
    length: u32,
}

impl ArrayElements {
    /// An array of `length` holes.
    pub fn with_length(length: u32) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    pub fn from_slots(dense: Vec<Option<PropertyDescriptor>>) -> Self {
        let length = u32::try_from(dense.len()).unwrap_or(u32::MAX);
        Self {
            dense,
            sparse: FxHashMap::default(),
            length,
        }
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get(&self, idx: u32) -> Option<&PropertyDescriptor> {
        match self.dense.get(idx as usize) {
            Some(slot) => slot.as_ref(),
            None => self.sparse.get(&idx),
        }
    }

    /// Stores an element, growing `length` past `idx` when needed.
    pub fn set(&mut self, idx: u32, desc: PropertyDescriptor) {
        let i = idx as usize;
        if i < self.dense.len() {
            self.dense[i] = Some(desc);
        } else if i <= self.dense.len() + DENSE_GROWTH_LIMIT {
            let start = self.dense.len();
            self.dense.resize(i + 1, None);
            for j in start..i {
                self.dense[j] = self.sparse.remove(&(j as u32));
            }
            self.sparse.remove(&idx);
            self.dense[i] = Some(desc);
        } else {
            self.sparse.insert(idx, desc);
        }
        if idx >= self.length {
            self.length = idx + 1;
        }
    }

    pub fn remove(&mut self, idx: u32) {
        match self.dense.get_mut(idx as usize) {
            Some(slot) => *slot = None,
            None => {
                self.sparse.remove(&idx);
            }
        }
    }

    /// Indices holding an element, ascending.
    pub fn indices(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .dense
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| i as u32)
            .collect();
        let mut sparse: Vec<u32> = self.sparse.keys().copied().collect();
        sparse.sort_unstable();
        out.extend(sparse);
        out
    }

    /// ArraySetLength on the storage. Shrinking stops just above the highest
    /// non-configurable element and reports failure.
    pub fn set_length(&mut self, new_len: u32) -> bool {
        if new_len >= self.length {
            self.length = new_len;
            return true;
        }
        let blocker = self
            .indices()
            .into_iter()
            .rev()
            .take_while(|&i| i >= new_len)
            .find(|&i| self.get(i).is_some_and(|d| !d.configurable()));
        let (keep, ok) = match blocker {
            Some(i) => (i + 1, false),
            None => (new_len, true),
        };
        self.dense.truncate(keep as usize);
        self.sparse.retain(|&i, _| i < keep);
        self.length = keep;
        ok
    }
}

/// Exotic behaviour selector.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Ordinary,
    /// Index properties live here; `length` is synthesized from them.
    Array(ArrayElements),
    PrimitiveWrapper(JsValue),
    Error,
    Arguments,
    ArrayIterator {
        target: JsValue,
        index: usize,
        done: bool,
    },
}

pub struct JsObjectData {
    pub id: u64,
    pub(crate) properties: FxHashMap<PropertyKey, PropertyDescriptor>,
    pub(crate) property_order: Vec<PropertyKey>,
    pub prototype: Option<Rc<RefCell<JsObjectData>>>,
    pub callable: Option<JsFunction>,
    pub kind: ObjectKind,
    pub extensible: bool,
}

impl std::fmt::Debug for JsObjectData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObjectData")
            .field("id", &self.id)
            .field("kind", &self.class_name())
            .field("keys", &self.property_order)
            .finish()
    }
}

impl JsObjectData {
    pub(crate) fn new(prototype: Option<Rc<RefCell<JsObjectData>>>) -> Self {
        Self {
            id: 0,
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            prototype,
            callable: None,
            kind: ObjectKind::Ordinary,
            extensible: true,
        }
    }

    pub fn handle(&self) -> JsObject {
        JsObject { id: self.id }
    }

    pub fn prototype_handle(&self) -> Option<JsObject> {
        self.prototype.as_ref().map(|p| p.borrow().handle())
    }

    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Array(_) => "Array",
            ObjectKind::Error => "Error",
            ObjectKind::Arguments => "Arguments",
            ObjectKind::ArrayIterator { .. } => "Array Iterator",
            ObjectKind::PrimitiveWrapper(v) => match v {
                JsValue::Boolean(_) => "Boolean",
                JsValue::Number(_) => "Number",
                JsValue::String(_) => "String",
                JsValue::Symbol(_) => "Symbol",
                JsValue::BigInt(_) => "BigInt",
                _ => "Object",
            },
            ObjectKind::Ordinary if self.callable.is_some() => "Function",
            ObjectKind::Ordinary => "Object",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    fn string_wrapper_value(&self) -> Option<&JsString> {
        match &self.kind {
            ObjectKind::PrimitiveWrapper(JsValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn array_length(&self) -> Option<u32> {
        match &self.kind {
            ObjectKind::Array(elements) => Some(elements.len()),
            _ => None,
        }
    }

    /// [[GetOwnProperty]], including the synthesized properties of array
    /// and string exotics.
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if let Some(idx) = key.array_index() {
                    return elements.get(idx).cloned();
                }
                if is_length_key(key) {
                    return Some(PropertyDescriptor::data(
                        JsValue::Number(f64::from(elements.len())),
                        true,
                        false,
                        false,
                    ));
                }
            }
            ObjectKind::PrimitiveWrapper(JsValue::String(s)) => {
                if let Some(idx) = key.array_index()
                    && let Some(unit) = s.code_unit_at(idx as usize)
                {
                    return Some(PropertyDescriptor::data(
                        JsValue::String(JsString::from_code_units(vec![unit])),
                        false,
                        true,
                        false,
                    ));
                }
                if is_length_key(key) {
                    return Some(PropertyDescriptor::data(
                        JsValue::Number(s.len() as f64),
                        false,
                        false,
                        false,
                    ));
                }
            }
            _ => {}
        }
        self.properties.get(key).cloned()
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// [[OwnPropertyKeys]]: integer indices ascending, then strings in
    /// insertion order, then symbols in insertion order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut indexed: Vec<(u32, PropertyKey)> = Vec::new();
        match &self.kind {
            ObjectKind::Array(elements) => {
                for i in elements.indices() {
                    indexed.push((i, PropertyKey::String(JsString::from_str(&i.to_string()))));
                }
            }
            ObjectKind::PrimitiveWrapper(JsValue::String(s)) => {
                for i in 0..s.len() {
                    indexed.push((i as u32, PropertyKey::String(JsString::from_str(&i.to_string()))));
                }
            }
            _ => {}
        }
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for key in &self.property_order {
            if let Some(idx) = key.array_index() {
                indexed.push((idx, key.clone()));
            } else if key.is_symbol() {
                symbols.push(key.clone());
            } else {
                strings.push(key.clone());
            }
        }
        indexed.sort_by_key(|(idx, _)| *idx);
        let mut keys: Vec<PropertyKey> = indexed.into_iter().map(|(_, k)| k).collect();
        if self.is_array() || self.string_wrapper_value().is_some() {
            keys.push(PropertyKey::String(JsString::from_str("length")));
        }
        keys.extend(strings);
        keys.extend(symbols);
        keys
    }

    /// Stores a descriptor without any validation.
    pub fn insert_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        if let ObjectKind::Array(elements) = &mut self.kind
            && let Some(idx) = key.array_index()
        {
            elements.set(idx, desc);
            return;
        }
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    pub fn insert_value(&mut self, key: PropertyKey, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data_default(value));
    }

    pub fn insert_builtin(&mut self, key: PropertyKey, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::builtin(value));
    }

    /// [[Delete]] on own properties. Absent keys count as deleted.
    pub fn delete_own(&mut self, key: &PropertyKey) -> bool {
        let Some(current) = self.get_own_property(key) else {
            return true;
        };
        if !current.configurable() {
            return false;
        }
        if let ObjectKind::Array(elements) = &mut self.kind
            && let Some(idx) = key.array_index()
        {
            elements.remove(idx);
            return true;
        }
        self.properties.remove(key);
        self.property_order.retain(|k| k != key);
        true
    }

    /// ValidateAndApplyPropertyDescriptor for ordinary storage.
    pub fn define_own_property(&mut self, key: PropertyKey, patch: PropertyDescriptorPatch) -> bool {
        if self.is_array() && is_length_key(&key) {
            if patch.is_accessor_descriptor()
                || patch.configurable == Some(true)
                || patch.enumerable == Some(true)
            {
                return false;
            }
            let new_len = match &patch.value {
                Some(JsValue::Number(n)) => *n as u32,
                Some(_) => return false,
                None => self.array_length().unwrap_or(0),
            };
            return self.set_array_length(new_len, patch.writable);
        }
        let current = self.get_own_property(&key);
        let Some(current) = current else {
            if !self.extensible {
                return false;
            }
            let enumerable = patch.enumerable.unwrap_or(false);
            let configurable = patch.configurable.unwrap_or(false);
            let desc = if patch.is_accessor_descriptor() {
                PropertyDescriptor::Accessor {
                    get: patch.get.filter(|g| !g.is_undefined()),
                    set: patch.set.filter(|s| !s.is_undefined()),
                    enumerable,
                    configurable,
                }
            } else {
                PropertyDescriptor::Data {
                    value: patch.value.unwrap_or(JsValue::Undefined),
                    writable: patch.writable.unwrap_or(false),
                    enumerable,
                    configurable,
                }
            };
            self.insert_property(key, desc);
            return true;
        };

        if !current.configurable() {
            if patch.configurable == Some(true) {
                return false;
            }
            if patch.enumerable.is_some_and(|e| e != current.enumerable()) {
                return false;
            }
            if !patch.is_generic_descriptor()
                && patch.is_accessor_descriptor() != current.is_accessor_descriptor()
            {
                return false;
            }
            match &current {
                PropertyDescriptor::Accessor { get, set, .. } => {
                    if let Some(g) = &patch.get
                        && !same_function_slot(g, get)
                    {
                        return false;
                    }
                    if let Some(s) = &patch.set
                        && !same_function_slot(s, set)
                    {
                        return false;
                    }
                }
                PropertyDescriptor::Data {
                    value, writable, ..
                } => {
                    if !writable {
                        if patch.writable == Some(true) {
                            return false;
                        }
                        if let Some(v) = &patch.value
                            && !super::same_value(v, value)
                        {
                            return false;
                        }
                    }
                }
            }
        }

        let enumerable = patch.enumerable.unwrap_or(current.enumerable());
        let configurable = patch.configurable.unwrap_or(current.configurable());
        let desc = match current {
            PropertyDescriptor::Data {
                value, writable, ..
            } if !patch.is_accessor_descriptor() => PropertyDescriptor::Data {
                value: patch.value.unwrap_or(value),
                writable: patch.writable.unwrap_or(writable),
                enumerable,
                configurable,
            },
            PropertyDescriptor::Accessor { get, set, .. } if !patch.is_data_descriptor() => {
                PropertyDescriptor::Accessor {
                    get: match patch.get {
                        Some(g) if g.is_undefined() => None,
                        Some(g) => Some(g),
                        None => get,
                    },
                    set: match patch.set {
                        Some(s) if s.is_undefined() => None,
                        Some(s) => Some(s),
                        None => set,
                    },
                    enumerable,
                    configurable,
                }
            }
            // kind change on a configurable property
            PropertyDescriptor::Data { .. } => PropertyDescriptor::Accessor {
                get: patch.get.filter(|g| !g.is_undefined()),
                set: patch.set.filter(|s| !s.is_undefined()),
                enumerable,
                configurable,
            },
            PropertyDescriptor::Accessor { .. } => PropertyDescriptor::Data {
                value: patch.value.unwrap_or(JsValue::Undefined),
                writable: patch.writable.unwrap_or(false),
                enumerable,
                configurable,
            },
        };
        self.insert_property(key, desc);
        true
    }

    /// ArraySetLength once the new length has been validated.
    pub(crate) fn set_array_length(&mut self, new_len: u32, writable: Option<bool>) -> bool {
        if writable == Some(false) {
            // length stays writable; freezing arrays is not modelled
            return false;
        }
        let ObjectKind::Array(elements) = &mut self.kind else {
            return false;
        };
        elements.set_length(new_len)
    }
}

fn same_function_slot(patch: &JsValue, current: &Option<JsValue>) -> bool {
    match current {
        Some(c) => super::same_value(patch, c),
        None => patch.is_undefined(),
    }
}

pub(crate) fn is_length_key(key: &PropertyKey) -> bool {
    matches!(key, PropertyKey::String(s) if s.code_units == [108, 101, 110, 103, 116, 104])
}
