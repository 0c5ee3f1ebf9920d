use super::*;
use num_bigint::BigInt;
use std::cmp::Ordering;

/// Hint passed to ToPrimitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    String,
    Number,
}

impl PreferredType {
    fn as_str(self) -> &'static str {
        match self {
            PreferredType::Default => "default",
            PreferredType::String => "string",
            PreferredType::Number => "number",
        }
    }
}

/// Result of ToNumeric.
#[derive(Clone, Debug, PartialEq)]
pub enum Numeric {
    Number(f64),
    BigInt(BigInt),
}

impl From<Numeric> for JsValue {
    fn from(n: Numeric) -> Self {
        match n {
            Numeric::Number(n) => JsValue::Number(n),
            Numeric::BigInt(b) => JsValue::from(b),
        }
    }
}

impl Interpreter {
    // §7.1.1 ToPrimitive
    pub fn to_primitive(&mut self, value: &JsValue, hint: PreferredType) -> JsResult<JsValue> {
        if !value.is_object() {
            return Ok(value.clone());
        }
        let to_prim = self.intrinsics.symbol_to_primitive.clone();
        if let Some(exotic) = self.get_method(value, to_prim)? {
            let result = self.call(&exotic, value, &[JsValue::from(hint.as_str())])?;
            if result.is_object() {
                return Err(self.create_type_error("Cannot convert object to primitive value"));
            }
            return Ok(result);
        }
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Default | PreferredType::Number => ["valueOf", "toString"],
        };
        self.ordinary_to_primitive(value, order)
    }

    // §7.1.1.1 OrdinaryToPrimitive
    fn ordinary_to_primitive(&mut self, value: &JsValue, order: [&str; 2]) -> JsResult<JsValue> {
        for name in order {
            let method = self.get_v(value, name)?;
            if self.is_callable(&method) {
                let result = self.call(&method, value, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.create_type_error("Cannot convert object to primitive value"))
    }

    // §7.1.4 ToNumber
    pub fn to_number(&mut self, value: &JsValue) -> JsResult<f64> {
        match value {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(s)),
            JsValue::Symbol(_) => {
                Err(self.create_type_error("Cannot convert a Symbol value to a number"))
            }
            JsValue::BigInt(_) => {
                Err(self.create_type_error("Cannot convert a BigInt value to a number"))
            }
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::Number)?;
                self.to_number(&prim)
            }
        }
    }

    // §7.1.3 ToNumeric
    pub fn to_numeric(&mut self, value: &JsValue) -> JsResult<Numeric> {
        let prim = self.to_primitive(value, PreferredType::Number)?;
        if let JsValue::BigInt(b) = prim {
            return Ok(Numeric::BigInt(b.value));
        }
        Ok(Numeric::Number(self.to_number(&prim)?))
    }

    // §7.1.17 ToString
    pub fn to_js_string(&mut self, value: &JsValue) -> JsResult<JsString> {
        match value {
            JsValue::String(s) => Ok(s.clone()),
            JsValue::Symbol(_) => {
                Err(self.create_type_error("Cannot convert a Symbol value to a string"))
            }
            JsValue::BigInt(b) => Ok(JsString::from_str(&bigint_ops::to_string(&b.value))),
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                self.to_js_string(&prim)
            }
            JsValue::Undefined | JsValue::Null | JsValue::Boolean(_) | JsValue::Number(_) => {
                Ok(JsString::from_str(&value.to_string()))
            }
        }
    }

    // §7.1.18 ToObject
    pub fn to_object(&mut self, value: &JsValue) -> JsResult<JsObject> {
        match value {
            JsValue::Object(o) => Ok(*o),
            JsValue::Undefined | JsValue::Null => {
                Err(self.create_type_error("Cannot convert undefined or null to object"))
            }
            primitive => {
                let proto = self.prototype_for_primitive(primitive);
                Ok(self.create_object_of_kind(
                    &proto,
                    ObjectKind::PrimitiveWrapper(primitive.clone()),
                ))
            }
        }
    }

    // §7.1.19 ToPropertyKey
    pub fn to_property_key(&mut self, value: &JsValue) -> JsResult<PropertyKey> {
        match value {
            JsValue::String(s) => Ok(PropertyKey::String(s.clone())),
            JsValue::Symbol(s) => Ok(PropertyKey::Symbol(s.clone())),
            _ => {
                let key = self.to_primitive(value, PreferredType::String)?;
                match key {
                    JsValue::Symbol(s) => Ok(PropertyKey::Symbol(s)),
                    other => Ok(PropertyKey::String(self.to_js_string(&other)?)),
                }
            }
        }
    }

    // §7.1.20 ToLength
    pub fn to_length(&mut self, value: &JsValue) -> JsResult<f64> {
        let len = to_integer_or_infinity(self.to_number(value)?);
        Ok(len.clamp(0.0, 9_007_199_254_740_991.0))
    }

    pub fn to_int32(&mut self, value: &JsValue) -> JsResult<i32> {
        Ok(number_ops::to_int32(self.to_number(value)?))
    }

    pub fn to_uint32(&mut self, value: &JsValue) -> JsResult<u32> {
        Ok(number_ops::to_uint32(self.to_number(value)?))
    }

    // §7.2.14 IsLooselyEqual
    pub fn is_loosely_equal(&mut self, x: &JsValue, y: &JsValue) -> JsResult<bool> {
        if std::mem::discriminant(x) == std::mem::discriminant(y) {
            return Ok(is_strictly_equal(x, y));
        }
        Ok(match (x, y) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
            (JsValue::Number(n), JsValue::String(s)) | (JsValue::String(s), JsValue::Number(n)) => {
                *n == string_to_number(s)
            }
            (JsValue::BigInt(b), JsValue::String(s)) | (JsValue::String(s), JsValue::BigInt(b)) => {
                string_to_bigint(s).is_some_and(|n| n == b.value)
            }
            (JsValue::Boolean(b), other) | (other, JsValue::Boolean(b)) => {
                let n = JsValue::Number(if *b { 1.0 } else { 0.0 });
                return self.is_loosely_equal(&n, other);
            }
            (
                JsValue::Object(_),
                JsValue::String(_) | JsValue::Number(_) | JsValue::BigInt(_) | JsValue::Symbol(_),
            ) => {
                let prim = self.to_primitive(x, PreferredType::Default)?;
                return self.is_loosely_equal(&prim, y);
            }
            (
                JsValue::String(_) | JsValue::Number(_) | JsValue::BigInt(_) | JsValue::Symbol(_),
                JsValue::Object(_),
            ) => {
                let prim = self.to_primitive(y, PreferredType::Default)?;
                return self.is_loosely_equal(x, &prim);
            }
            (JsValue::BigInt(b), JsValue::Number(n)) | (JsValue::Number(n), JsValue::BigInt(b)) => {
                bigint_ops::compare_with_number(&b.value, *n) == Some(Ordering::Equal)
            }
            _ => false,
        })
    }

    /// §7.2.13 IsLessThan. `None` stands for the undefined result (a NaN was
    /// involved); relational operators treat it as false.
    pub fn is_less_than(
        &mut self,
        x: &JsValue,
        y: &JsValue,
        left_first: bool,
    ) -> JsResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, PreferredType::Number)?;
            let py = self.to_primitive(y, PreferredType::Number)?;
            (px, py)
        } else {
            let py = self.to_primitive(y, PreferredType::Number)?;
            let px = self.to_primitive(x, PreferredType::Number)?;
            (px, py)
        };
        match (&px, &py) {
            (JsValue::String(a), JsValue::String(b)) => return Ok(Some(a < b)),
            (JsValue::BigInt(a), JsValue::String(b)) => {
                return Ok(string_to_bigint(b).map(|b| a.value < b));
            }
            (JsValue::String(a), JsValue::BigInt(b)) => {
                return Ok(string_to_bigint(a).map(|a| a < b.value));
            }
            _ => {}
        }
        let nx = self.to_numeric(&px)?;
        let ny = self.to_numeric(&py)?;
        Ok(match (nx, ny) {
            (Numeric::Number(a), Numeric::Number(b)) => number_ops::less_than(a, b),
            (Numeric::BigInt(a), Numeric::BigInt(b)) => bigint_ops::less_than(&a, &b),
            (Numeric::BigInt(a), Numeric::Number(b)) => {
                bigint_ops::compare_with_number(&a, b).map(|o| o == Ordering::Less)
            }
            (Numeric::Number(a), Numeric::BigInt(b)) => {
                bigint_ops::compare_with_number(&b, a).map(|o| o == Ordering::Greater)
            }
        })
    }
}
