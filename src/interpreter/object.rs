use super::*;
use rustc_hash::FxHashSet;

impl PropertyDescriptor {
    /// Reads the property as seen from `receiver`: the stored value for data
    /// properties, the getter's result for accessors (`undefined` without a
    /// getter).
    pub fn get_value(&self, interp: &mut Interpreter, receiver: &JsValue) -> JsResult<JsValue> {
        match self {
            PropertyDescriptor::Data { value, .. } => Ok(value.clone()),
            PropertyDescriptor::Accessor { get: Some(getter), .. } => {
                interp.call(getter, receiver, &[])
            }
            PropertyDescriptor::Accessor { get: None, .. } => Ok(JsValue::Undefined),
        }
    }

    /// Writes through this descriptor on behalf of `receiver`. A read-only
    /// data property reports failure; an accessor without a setter ignores
    /// the write.
    pub fn set_value(
        &self,
        interp: &mut Interpreter,
        receiver: &JsValue,
        key: PropertyKey,
        value: JsValue,
    ) -> JsResult<bool> {
        match self {
            PropertyDescriptor::Data { writable: false, .. } => Ok(false),
            PropertyDescriptor::Data { .. } => interp.set_on_receiver(receiver, key, value),
            PropertyDescriptor::Accessor { set: Some(setter), .. } => {
                interp.call(setter, receiver, &[value])?;
                Ok(true)
            }
            PropertyDescriptor::Accessor { set: None, .. } => Ok(true),
        }
    }
}

impl Interpreter {
    pub fn get_prototype_of(&self, obj: &JsObject) -> Option<JsObject> {
        self.get_object(obj).borrow().prototype_handle()
    }

    /// Installs `proto` unless that would make the chain cyclic. On failure
    /// the object is left untouched.
    pub fn set_prototype_of(&mut self, obj: &JsObject, proto: Option<&JsObject>) -> bool {
        let data = self.get_object(obj);
        let current = data.borrow().prototype_handle();
        if current.as_ref() == proto {
            return true;
        }
        if !data.borrow().extensible {
            return false;
        }
        let mut candidate = proto.copied();
        while let Some(p) = candidate {
            if p == *obj {
                return false;
            }
            candidate = self.get_prototype_of(&p);
        }
        data.borrow_mut().prototype = proto.map(|p| self.get_object(p));
        true
    }

    pub fn get_own_property(
        &self,
        obj: &JsObject,
        key: impl PropertyKeyLike,
    ) -> Option<PropertyDescriptor> {
        self.get_object(obj)
            .borrow()
            .get_own_property(&key.into_property_key())
    }

    pub fn has_own_property(&self, obj: &JsObject, key: impl PropertyKeyLike) -> bool {
        self.get_own_property(obj, key).is_some()
    }

    pub fn has_property(&self, obj: &JsObject, key: impl PropertyKeyLike) -> bool {
        let key = key.into_property_key();
        let mut current = Some(self.get_object(obj));
        while let Some(o) = current {
            let b = o.borrow();
            if b.has_own_property(&key) {
                return true;
            }
            current = b.prototype.clone();
        }
        false
    }

    /// Finds the nearest descriptor for `key` along the prototype chain.
    fn lookup_property(&self, obj: &JsObject, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let mut current = Some(self.get_object(obj));
        while let Some(o) = current {
            let (desc, next) = {
                let b = o.borrow();
                (b.get_own_property(key), b.prototype.clone())
            };
            if desc.is_some() {
                return desc;
            }
            current = next;
        }
        None
    }

    pub fn get(&mut self, obj: &JsObject, key: impl PropertyKeyLike) -> JsResult<JsValue> {
        let receiver = JsValue::Object(*obj);
        self.get_with_receiver(obj, key, &receiver)
    }

    pub fn get_with_receiver(
        &mut self,
        obj: &JsObject,
        key: impl PropertyKeyLike,
        receiver: &JsValue,
    ) -> JsResult<JsValue> {
        let key = key.into_property_key();
        match self.lookup_property(obj, &key) {
            Some(desc) => desc.get_value(self, receiver),
            None => Ok(JsValue::Undefined),
        }
    }

    /// Property read on an arbitrary value. Primitives resolve through their
    /// wrapper prototype without allocating a wrapper.
    pub fn get_v(&mut self, base: &JsValue, key: impl PropertyKeyLike) -> JsResult<JsValue> {
        let key = key.into_property_key();
        let start = match base {
            JsValue::Object(o) => return self.get_with_receiver(o, key, base),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.create_type_error(&format!(
                    "Cannot read properties of {base} (reading '{key}')"
                )));
            }
            JsValue::String(s) => {
                if is_length_key(&key) {
                    return Ok(JsValue::Number(s.len() as f64));
                }
                if let Some(idx) = key.array_index()
                    && let Some(unit) = s.code_unit_at(idx as usize)
                {
                    return Ok(JsValue::String(JsString::from_code_units(vec![unit])));
                }
                self.intrinsics.string_prototype
            }
            other => self.prototype_for_primitive(other),
        };
        self.get_with_receiver(&start, key, base)
    }

    pub(crate) fn prototype_for_primitive(&self, value: &JsValue) -> JsObject {
        match value {
            JsValue::Boolean(_) => self.intrinsics.boolean_prototype,
            JsValue::Number(_) => self.intrinsics.number_prototype,
            JsValue::String(_) => self.intrinsics.string_prototype,
            JsValue::Symbol(_) => self.intrinsics.symbol_prototype,
            JsValue::BigInt(_) => self.intrinsics.bigint_prototype,
            JsValue::Object(o) => *o,
            JsValue::Undefined | JsValue::Null => self.intrinsics.object_prototype,
        }
    }

    /// [[Set]]: resolves `key` along the chain of `obj` and writes on behalf
    /// of `receiver`. Returns false when the write was refused.
    pub fn set(
        &mut self,
        obj: &JsObject,
        key: impl PropertyKeyLike,
        value: JsValue,
        receiver: &JsValue,
    ) -> JsResult<bool> {
        let key = key.into_property_key();
        match self.lookup_property(obj, &key) {
            Some(desc) => desc.set_value(self, receiver, key, value),
            None => self.set_on_receiver(receiver, key, value),
        }
    }

    pub(crate) fn set_on_receiver(
        &mut self,
        receiver: &JsValue,
        key: PropertyKey,
        value: JsValue,
    ) -> JsResult<bool> {
        let JsValue::Object(target) = receiver else {
            return Ok(false);
        };
        let existing = self.get_object(target).borrow().get_own_property(&key);
        match existing {
            Some(PropertyDescriptor::Accessor { .. }) => Ok(false),
            Some(PropertyDescriptor::Data { writable: false, .. }) => Ok(false),
            Some(PropertyDescriptor::Data { .. }) => {
                self.define_own_property(target, key, PropertyDescriptorPatch::value(value))
            }
            None => self.create_data_property(target, key, value),
        }
    }

    /// PutValue for a property reference: [[Set]], turning a refused write
    /// into a TypeError in strict code.
    pub(crate) fn put(
        &mut self,
        base: &JsValue,
        key: PropertyKey,
        value: JsValue,
        strict: bool,
    ) -> JsResult<()> {
        let succeeded = match base {
            JsValue::Object(o) => self.set(o, key.clone(), value, base)?,
            JsValue::Undefined | JsValue::Null => {
                return Err(self.create_type_error(&format!(
                    "Cannot set properties of {base} (setting '{key}')"
                )));
            }
            JsValue::String(s)
                if is_length_key(&key)
                    || key.array_index().is_some_and(|i| (i as usize) < s.len()) =>
            {
                false
            }
            primitive => {
                let proto = self.prototype_for_primitive(primitive);
                self.set(&proto, key.clone(), value, base)?
            }
        };
        if !succeeded && strict {
            let what = type_tag(base);
            return Err(self.create_type_error(&format!(
                "Cannot assign to read only property '{key}' of {what}"
            )));
        }
        Ok(())
    }

    /// [[Delete]]: only ever touches the object's own table.
    pub fn delete_property(&mut self, obj: &JsObject, key: impl PropertyKeyLike) -> bool {
        self.get_object(obj)
            .borrow_mut()
            .delete_own(&key.into_property_key())
    }

    /// [[DefineOwnProperty]]. Array `length` is validated here because the
    /// conversion may run user code.
    pub fn define_own_property(
        &mut self,
        obj: &JsObject,
        key: impl PropertyKeyLike,
        mut patch: PropertyDescriptorPatch,
    ) -> JsResult<bool> {
        let key = key.into_property_key();
        let data = self.get_object(obj);
        let is_array = data.borrow().is_array();
        if is_array
            && is_length_key(&key)
            && let Some(value) = patch.value.take()
        {
            let number_len = self.to_number(&value)?;
            let new_len = number_ops::to_uint32(number_len);
            if f64::from(new_len) != number_len {
                return Err(self.create_range_error("Invalid array length"));
            }
            patch.value = Some(JsValue::Number(f64::from(new_len)));
        }
        Ok(data.borrow_mut().define_own_property(key, patch))
    }

    pub fn define_own_property_or_throw(
        &mut self,
        obj: &JsObject,
        key: impl PropertyKeyLike,
        patch: PropertyDescriptorPatch,
    ) -> JsResult<()> {
        let key = key.into_property_key();
        if self.define_own_property(obj, key.clone(), patch)? {
            Ok(())
        } else {
            Err(self.create_type_error(&format!("Cannot redefine property: {key}")))
        }
    }

    pub fn create_data_property(
        &mut self,
        obj: &JsObject,
        key: impl PropertyKeyLike,
        value: JsValue,
    ) -> JsResult<bool> {
        self.define_own_property(
            obj,
            key,
            PropertyDescriptor::data_default(value).into(),
        )
    }

    pub fn create_data_property_or_throw(
        &mut self,
        obj: &JsObject,
        key: impl PropertyKeyLike,
        value: JsValue,
    ) -> JsResult<()> {
        self.define_own_property_or_throw(
            obj,
            key,
            PropertyDescriptor::data_default(value).into(),
        )
    }

    pub fn own_property_keys(&self, obj: &JsObject) -> Vec<PropertyKey> {
        self.get_object(obj).borrow().own_keys()
    }

    /// The string keys `for-in` visits: enumerable properties of the object
    /// and its prototypes, each name once, shadowed names skipped.
    pub fn enumerate_object_properties(&self, obj: &JsObject) -> Vec<JsString> {
        let mut visited: FxHashSet<PropertyKey> = FxHashSet::default();
        let mut names = Vec::new();
        let mut current = Some(self.get_object(obj));
        while let Some(o) = current {
            let b = o.borrow();
            for key in b.own_keys() {
                let PropertyKey::String(name) = &key else {
                    continue;
                };
                if !visited.insert(key.clone()) {
                    continue;
                }
                if b.get_own_property(&key).is_some_and(|d| d.enumerable()) {
                    names.push(name.clone());
                }
            }
            current = b.prototype.clone();
        }
        names
    }

    pub fn is_callable(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(o) => self.get_object(o).borrow().is_callable(),
            _ => false,
        }
    }

    pub fn is_constructor(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(o) => self.get_object(o).borrow().is_constructor(),
            _ => false,
        }
    }

    pub fn is_array(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(o) => self.get_object(o).borrow().is_array(),
            _ => false,
        }
    }

    /// GetMethod: `undefined`/`null` mean absent, anything else must be
    /// callable.
    pub(crate) fn get_method(
        &mut self,
        value: &JsValue,
        key: impl PropertyKeyLike,
    ) -> JsResult<Option<JsValue>> {
        let key = key.into_property_key();
        let func = self.get_v(value, key.clone())?;
        if func.is_nullish() {
            return Ok(None);
        }
        if !self.is_callable(&func) {
            return Err(self.create_type_error(&format!("{key} is not a function")));
        }
        Ok(Some(func))
    }

    /// The `instanceof` operator.
    pub fn instance_of(&mut self, value: &JsValue, target: &JsValue) -> JsResult<bool> {
        if !target.is_object() {
            return Err(self.create_type_error("Right-hand side of 'instanceof' is not an object"));
        }
        let has_instance = self.intrinsics.symbol_has_instance.clone();
        if let Some(handler) = self.get_method(target, has_instance)? {
            let result = self.call(&handler, target, std::slice::from_ref(value))?;
            return Ok(to_boolean(&result));
        }
        if !self.is_callable(target) {
            return Err(self.create_type_error("Right-hand side of 'instanceof' is not callable"));
        }
        self.ordinary_has_instance(target, value)
    }

    pub fn ordinary_has_instance(&mut self, constructor: &JsValue, value: &JsValue) -> JsResult<bool> {
        let JsValue::Object(ctor) = constructor else {
            return Ok(false);
        };
        if !self.is_callable(constructor) {
            return Ok(false);
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let proto = self.get(ctor, "prototype")?;
        let JsValue::Object(proto) = proto else {
            return Err(self.create_type_error(&format!(
                "Function has non-object prototype '{proto}' in instanceof check"
            )));
        };
        let mut current = self.get_prototype_of(obj);
        while let Some(p) = current {
            if p == proto {
                return Ok(true);
            }
            current = self.get_prototype_of(&p);
        }
        Ok(false)
    }

    /// ToPropertyDescriptor for descriptor objects handed to
    /// `Object.defineProperty`.
    pub(crate) fn to_property_descriptor(&mut self, value: &JsValue) -> JsResult<PropertyDescriptorPatch> {
        let JsValue::Object(desc_obj) = value else {
            return Err(self.create_type_error(&format!(
                "Property description must be an object: {value}"
            )));
        };
        let mut patch = PropertyDescriptorPatch::default();
        if self.has_property(desc_obj, "enumerable") {
            patch.enumerable = Some(to_boolean(&self.get(desc_obj, "enumerable")?));
        }
        if self.has_property(desc_obj, "configurable") {
            patch.configurable = Some(to_boolean(&self.get(desc_obj, "configurable")?));
        }
        if self.has_property(desc_obj, "value") {
            patch.value = Some(self.get(desc_obj, "value")?);
        }
        if self.has_property(desc_obj, "writable") {
            patch.writable = Some(to_boolean(&self.get(desc_obj, "writable")?));
        }
        for (field, name) in [("get", "Getter"), ("set", "Setter")] {
            if !self.has_property(desc_obj, field) {
                continue;
            }
            let func = self.get(desc_obj, field)?;
            if !func.is_undefined() && !self.is_callable(&func) {
                return Err(self.create_type_error(&format!("{name} must be a function: {func}")));
            }
            if field == "get" {
                patch.get = Some(func);
            } else {
                patch.set = Some(func);
            }
        }
        if patch.is_accessor_descriptor() && patch.is_data_descriptor() {
            return Err(self.create_type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(patch)
    }

    pub(crate) fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> JsValue {
        let result = self.create_object();
        let data = self.get_object(&result);
        let mut r = data.borrow_mut();
        match desc {
            PropertyDescriptor::Data {
                value, writable, ..
            } => {
                r.insert_value("value".into_property_key(), value.clone());
                r.insert_value("writable".into_property_key(), JsValue::Boolean(*writable));
            }
            PropertyDescriptor::Accessor { get, set, .. } => {
                r.insert_value(
                    "get".into_property_key(),
                    get.clone().unwrap_or(JsValue::Undefined),
                );
                r.insert_value(
                    "set".into_property_key(),
                    set.clone().unwrap_or(JsValue::Undefined),
                );
            }
        }
        r.insert_value(
            "enumerable".into_property_key(),
            JsValue::Boolean(desc.enumerable()),
        );
        r.insert_value(
            "configurable".into_property_key(),
            JsValue::Boolean(desc.configurable()),
        );
        JsValue::Object(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(v: &JsValue) -> f64 {
        v.as_number().unwrap()
    }

    #[test]
    fn get_resolves_nearest_owner() {
        let mut interp = Interpreter::new();
        let a = interp.create_object();
        let b = interp.create_object_with_proto(Some(&a));
        let c = interp.create_object_with_proto(Some(&b));
        interp.create_data_property(&a, "k", JsValue::Number(1.0)).unwrap();
        assert_eq!(num(&interp.get(&c, "k").unwrap()), 1.0);
        interp.create_data_property(&b, "k", JsValue::Number(2.0)).unwrap();
        assert_eq!(num(&interp.get(&c, "k").unwrap()), 2.0);
        assert!(interp.get(&c, "missing").unwrap().is_undefined());
    }

    #[test]
    fn set_creates_own_property_on_receiver() {
        let mut interp = Interpreter::new();
        let proto = interp.create_object();
        interp.create_data_property(&proto, "x", JsValue::Number(1.0)).unwrap();
        let child = interp.create_object_with_proto(Some(&proto));
        let receiver = JsValue::Object(child);
        assert!(interp.set(&child, "x", JsValue::Number(5.0), &receiver).unwrap());
        assert_eq!(num(&interp.get(&child, "x").unwrap()), 5.0);
        assert_eq!(num(&interp.get(&proto, "x").unwrap()), 1.0);
    }

    #[test]
    fn set_refuses_inherited_read_only() {
        let mut interp = Interpreter::new();
        let proto = interp.create_object();
        interp
            .define_own_property(
                &proto,
                "x",
                PropertyDescriptor::data(JsValue::Number(1.0), false, true, true).into(),
            )
            .unwrap();
        let child = interp.create_object_with_proto(Some(&proto));
        let receiver = JsValue::Object(child);
        assert!(!interp.set(&child, "x", JsValue::Number(5.0), &receiver).unwrap());
        assert!(!interp.has_own_property(&child, "x"));
        let err = interp.put(&receiver, "x".into_property_key(), JsValue::Number(5.0), true);
        assert!(err.is_err());
        assert!(interp.put(&receiver, "x".into_property_key(), JsValue::Number(5.0), false).is_ok());
    }

    #[test]
    fn accessor_without_setter_ignores_writes() {
        let mut interp = Interpreter::new();
        let obj = interp.create_object();
        interp
            .define_own_property(
                &obj,
                "ro",
                PropertyDescriptor::accessor(None, None, true, true).into(),
            )
            .unwrap();
        let receiver = JsValue::Object(obj);
        assert!(interp.set(&obj, "ro", JsValue::Number(1.0), &receiver).unwrap());
        assert!(interp.get(&obj, "ro").unwrap().is_undefined());
    }

    #[test]
    fn delete_only_touches_own_configurable() {
        let mut interp = Interpreter::new();
        let proto = interp.create_object();
        interp.create_data_property(&proto, "inherited", JsValue::Null).unwrap();
        let obj = interp.create_object_with_proto(Some(&proto));
        interp
            .define_own_property(
                &obj,
                "fixed",
                PropertyDescriptor::data(JsValue::Null, true, true, false).into(),
            )
            .unwrap();
        assert!(interp.delete_property(&obj, "inherited"));
        assert!(interp.has_property(&obj, "inherited"));
        assert!(!interp.delete_property(&obj, "fixed"));
        assert!(interp.delete_property(&obj, "absent"));
    }

    #[test]
    fn prototype_cycles_are_rejected() {
        let mut interp = Interpreter::new();
        let a = interp.create_object();
        let b = interp.create_object_with_proto(Some(&a));
        let c = interp.create_object_with_proto(Some(&b));
        let before = interp.get_prototype_of(&a);
        assert!(!interp.set_prototype_of(&a, Some(&c)));
        assert_eq!(interp.get_prototype_of(&a), before);
        assert!(!interp.set_prototype_of(&a, Some(&a)));
        assert!(interp.set_prototype_of(&c, Some(&a)));
        assert!(interp.set_prototype_of(&c, Some(&a)));
        assert!(interp.set_prototype_of(&a, None));
        assert_eq!(interp.get_prototype_of(&a), None);
    }

    #[test]
    fn array_length_definition() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![JsValue::Number(1.0), JsValue::Number(2.0), JsValue::Number(3.0)]);
        let obj = *arr.as_object().unwrap();
        interp.set(&obj, "length", JsValue::Number(1.0), &arr).unwrap();
        assert_eq!(num(&interp.get(&obj, "length").unwrap()), 1.0);
        assert!(interp.get(&obj, 1u32).unwrap().is_undefined());
        interp.set(&obj, 5u32, JsValue::Number(9.0), &arr).unwrap();
        assert_eq!(num(&interp.get(&obj, "length").unwrap()), 6.0);
        assert!(!interp.has_own_property(&obj, 3u32));

        let err = interp.set(&obj, "length", JsValue::Number(1.5), &arr).unwrap_err();
        assert_eq!(interp.format_value(&err), "RangeError: Invalid array length");
        let err = interp.set(&obj, "length", JsValue::Number(-1.0), &arr).unwrap_err();
        assert_eq!(interp.format_value(&err), "RangeError: Invalid array length");
        interp.set(&obj, "length", JsValue::from("2"), &arr).unwrap();
        assert_eq!(num(&interp.get(&obj, "length").unwrap()), 2.0);
    }

    #[test]
    fn huge_array_lengths_and_indices_stay_cheap() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![JsValue::Number(1.0)]);
        let obj = *arr.as_object().unwrap();
        interp.set(&obj, "length", JsValue::Number(4294967295.0), &arr).unwrap();
        assert_eq!(num(&interp.get(&obj, "length").unwrap()), 4294967295.0);
        interp.set(&obj, 1_000_000_000u32, JsValue::Number(7.0), &arr).unwrap();
        assert_eq!(num(&interp.get(&obj, 1_000_000_000u32).unwrap()), 7.0);
        assert_eq!(interp.own_property_keys(&obj).len(), 3);
        interp.set(&obj, "length", JsValue::Number(1.0), &arr).unwrap();
        assert!(!interp.has_own_property(&obj, 1_000_000_000u32));
        assert_eq!(num(&interp.get(&obj, 0u32).unwrap()), 1.0);
    }

    #[test]
    fn array_keys_precede_named_properties() {
        let mut interp = Interpreter::new();
        let arr = interp.create_array(vec![JsValue::Null, JsValue::Null]);
        let obj = *arr.as_object().unwrap();
        interp.create_data_property(&obj, "name", JsValue::Null).unwrap();
        let keys: Vec<String> = interp
            .own_property_keys(&obj)
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["0", "1", "length", "name"]);
    }

    #[test]
    fn enumeration_skips_shadowed_and_non_enumerable() {
        let mut interp = Interpreter::new();
        let proto = interp.create_object();
        interp.create_data_property(&proto, "a", JsValue::Null).unwrap();
        interp.create_data_property(&proto, "b", JsValue::Null).unwrap();
        let obj = interp.create_object_with_proto(Some(&proto));
        interp
            .define_own_property(
                &obj,
                "a",
                PropertyDescriptor::data(JsValue::Null, true, false, true).into(),
            )
            .unwrap();
        interp.create_data_property(&obj, "c", JsValue::Null).unwrap();
        let names: Vec<String> = interp
            .enumerate_object_properties(&obj)
            .iter()
            .map(|s| s.to_rust_string())
            .collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[test]
    fn primitive_property_reads() {
        let mut interp = Interpreter::new();
        let s = JsValue::from("hey");
        assert_eq!(num(&interp.get_v(&s, "length").unwrap()), 3.0);
        let ch = interp.get_v(&s, 1u32).unwrap();
        assert!(matches!(ch, JsValue::String(c) if c.to_rust_string() == "e"));
        let err = interp.get_v(&JsValue::Undefined, "x").unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: Cannot read properties of undefined (reading 'x')"
        );
    }
}
