use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
    Object(JsObject),
}

// UTF-16 code unit string; ordering is code-unit lexicographic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString {
    pub code_units: Vec<u16>,
}

impl JsString {
    /// Longest string the engine builds, in code units.
    pub const MAX_LENGTH: usize = (1 << 29) - 24;

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect(),
        }
    }

    pub fn from_code_units(code_units: Vec<u16>) -> Self {
        Self { code_units }
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn code_unit_at(&self, index: usize) -> Option<u16> {
        self.code_units.get(index).copied()
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        let mut code_units = Vec::with_capacity(self.len() + other.len());
        code_units.extend_from_slice(&self.code_units);
        code_units.extend_from_slice(&other.code_units);
        JsString { code_units }
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_str(s)
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::from_str(&s)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

/// A symbol is equal only to itself; the description plays no part in
/// identity.
#[derive(Clone, Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<JsString>,
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl Hash for JsSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for JsSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "Symbol({desc})"),
            None => write!(f, "Symbol()"),
        }
    }
}

// Well-known symbols (§6.1.5.1) the runtime core consults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WellKnownSymbol {
    HasInstance,
    Iterator,
    ToPrimitive,
    ToStringTag,
}

impl WellKnownSymbol {
    pub const ALL: [WellKnownSymbol; 4] = [
        WellKnownSymbol::HasInstance,
        WellKnownSymbol::Iterator,
        WellKnownSymbol::ToPrimitive,
        WellKnownSymbol::ToStringTag,
    ];

    pub fn property_name(self) -> &'static str {
        match self {
            WellKnownSymbol::HasInstance => "hasInstance",
            WellKnownSymbol::Iterator => "iterator",
            WellKnownSymbol::ToPrimitive => "toPrimitive",
            WellKnownSymbol::ToStringTag => "toStringTag",
        }
    }

    pub fn description(self) -> String {
        format!("Symbol.{}", self.property_name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsBigInt {
    pub value: num_bigint::BigInt,
}

impl From<num_bigint::BigInt> for JsBigInt {
    fn from(value: num_bigint::BigInt) -> Self {
        Self { value }
    }
}

/// Handle to an object living in an interpreter's heap. Identity equality
/// of objects is equality of handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JsObject {
    pub id: u64,
}

/// Property keys are either strings or symbols; numbers are canonicalised to
/// their string form before they get here.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

impl PropertyKey {
    /// The array index this key denotes, if it is a canonical numeric string
    /// in `0..2^32 - 1`.
    pub fn array_index(&self) -> Option<u32> {
        let PropertyKey::String(s) = self else {
            return None;
        };
        let units = &s.code_units;
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == u16::from(b'0') {
            return None;
        }
        let mut n: u64 = 0;
        for &u in units {
            if !(u16::from(b'0')..=u16::from(b'9')).contains(&u) {
                return None;
            }
            n = n * 10 + u64::from(u - u16::from(b'0'));
        }
        if n >= u64::from(u32::MAX) {
            return None;
        }
        Some(n as u32)
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.clone()),
            PropertyKey::Symbol(s) => JsValue::Symbol(s.clone()),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{s}"),
        }
    }
}

/// Anything the object model accepts where a property key is expected.
pub trait PropertyKeyLike {
    fn into_property_key(self) -> PropertyKey;
}

impl PropertyKeyLike for PropertyKey {
    fn into_property_key(self) -> PropertyKey {
        self
    }
}

impl PropertyKeyLike for &PropertyKey {
    fn into_property_key(self) -> PropertyKey {
        self.clone()
    }
}

impl PropertyKeyLike for &str {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(JsString::from_str(self))
    }
}

impl PropertyKeyLike for String {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(JsString::from_str(&self))
    }
}

impl PropertyKeyLike for &String {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(JsString::from_str(self))
    }
}

impl PropertyKeyLike for JsString {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(self)
    }
}

impl PropertyKeyLike for &JsString {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(self.clone())
    }
}

impl PropertyKeyLike for JsSymbol {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::Symbol(self)
    }
}

impl PropertyKeyLike for &JsSymbol {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::Symbol(self.clone())
    }
}

impl PropertyKeyLike for u32 {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(JsString::from_str(&self.to_string()))
    }
}

impl PropertyKeyLike for u64 {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(JsString::from_str(&self.to_string()))
    }
}

impl PropertyKeyLike for usize {
    fn into_property_key(self) -> PropertyKey {
        PropertyKey::String(JsString::from_str(&self.to_string()))
    }
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JsValue::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsValue::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, JsValue::Symbol(_))
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self, JsValue::BigInt(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, JsValue::Number(n) if n.is_nan())
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from_str(&s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsSymbol> for JsValue {
    fn from(s: JsSymbol) -> Self {
        JsValue::Symbol(s)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

impl From<num_bigint::BigInt> for JsValue {
    fn from(value: num_bigint::BigInt) -> Self {
        JsValue::BigInt(JsBigInt { value })
    }
}

// §6.1.6.1 Number type operations
pub mod number_ops {
    pub fn unary_minus(x: f64) -> f64 {
        if x.is_nan() { f64::NAN } else { -x }
    }

    pub fn bitwise_not(x: f64) -> f64 {
        let n = to_int32(x);
        f64::from(!n)
    }

    pub fn exponentiate(base: f64, exp: f64) -> f64 {
        if exp.is_nan() {
            return f64::NAN;
        }
        if base.abs() == 1.0 && exp.is_infinite() {
            return f64::NAN;
        }
        base.powf(exp)
    }

    pub fn multiply(x: f64, y: f64) -> f64 {
        x * y
    }

    pub fn divide(x: f64, y: f64) -> f64 {
        x / y
    }

    pub fn remainder(x: f64, y: f64) -> f64 {
        // truncating remainder, sign follows the dividend
        x % y
    }

    pub fn add(x: f64, y: f64) -> f64 {
        x + y
    }

    pub fn subtract(x: f64, y: f64) -> f64 {
        x - y
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        let lnum = to_int32(x);
        let shift = to_uint32(y) & 0x1F;
        f64::from(lnum.wrapping_shl(shift))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        let lnum = to_int32(x);
        let shift = to_uint32(y) & 0x1F;
        f64::from(lnum.wrapping_shr(shift))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        let lnum = to_uint32(x);
        let shift = to_uint32(y) & 0x1F;
        f64::from(lnum.wrapping_shr(shift))
    }

    pub fn less_than(x: f64, y: f64) -> Option<bool> {
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(x < y)
        }
    }

    pub fn equal(x: f64, y: f64) -> bool {
        x == y
    }

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn same_value_zero(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        x == y
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    /// Number::toString(x) with radix 10: shortest round-trip digits,
    /// exponential form outside `1e-7 < |x| < 1e21`.
    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format_finite(x).to_string()
    }

    // §7.1.7 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        if !x.is_finite() || x == 0.0 {
            return 0;
        }
        x.trunc().rem_euclid(4_294_967_296.0) as u32
    }

    // §7.1.6 ToInt32
    pub fn to_int32(x: f64) -> i32 {
        to_uint32(x) as i32
    }
}

// §6.1.6.2 BigInt type operations
pub mod bigint_ops {
    use num_bigint::{BigInt, BigUint, Sign};
    use std::cmp::Ordering;

    pub fn unary_minus(x: &BigInt) -> BigInt {
        -x
    }

    pub fn bitwise_not(x: &BigInt) -> BigInt {
        // ~x = -(x + 1) for arbitrary precision
        let result: BigInt = x + 1;
        -result
    }

    /// Left shifts past this many bits are refused instead of allocated.
    const MAX_SHIFT_BITS: u64 = 1 << 30;

    pub fn exponentiate(base: &BigInt, exp: &BigInt) -> Result<BigInt, &'static str> {
        if exp.sign() == Sign::Minus {
            return Err("Exponent must be non-negative");
        }
        if exp.sign() == Sign::NoSign {
            return Ok(BigInt::from(1));
        }
        // 0, 1 and -1 stay small for any exponent
        if base.sign() == Sign::NoSign {
            return Ok(BigInt::from(0));
        }
        if *base.magnitude() == BigUint::from(1u32) {
            let odd = exp % BigInt::from(2) != BigInt::from(0);
            return Ok(if odd { base.clone() } else { BigInt::from(1) });
        }
        let exp_u32: u32 = exp.try_into().map_err(|_| "Maximum BigInt size exceeded")?;
        Ok(base.pow(exp_u32))
    }

    pub fn multiply(x: &BigInt, y: &BigInt) -> BigInt {
        x * y
    }

    pub fn divide(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        if y.sign() == Sign::NoSign {
            return Err("Division by zero");
        }
        Ok(x / y)
    }

    pub fn remainder(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        if y.sign() == Sign::NoSign {
            return Err("Division by zero");
        }
        Ok(x % y)
    }

    pub fn add(x: &BigInt, y: &BigInt) -> BigInt {
        x + y
    }

    pub fn subtract(x: &BigInt, y: &BigInt) -> BigInt {
        x - y
    }

    pub fn left_shift(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        shift(x, y.magnitude(), y.sign() != Sign::Minus)
    }

    pub fn signed_right_shift(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        shift(x, y.magnitude(), y.sign() == Sign::Minus)
    }

    /// Shifts by an arbitrary-precision amount. Right shifts round toward
    /// negative infinity, so a large enough one leaves 0 or -1.
    fn shift(x: &BigInt, amount: &BigUint, left: bool) -> Result<BigInt, &'static str> {
        if x.sign() == Sign::NoSign {
            return Ok(BigInt::from(0));
        }
        let bits = u64::try_from(amount).ok();
        if left {
            match bits {
                Some(n) if n <= MAX_SHIFT_BITS => Ok(x << n),
                _ => Err("Maximum BigInt size exceeded"),
            }
        } else {
            match bits {
                Some(n) if n < x.bits() => Ok(x >> n),
                _ if x.sign() == Sign::Minus => Ok(BigInt::from(-1)),
                _ => Ok(BigInt::from(0)),
            }
        }
    }

    pub fn unsigned_right_shift(_x: &BigInt, _y: &BigInt) -> Result<BigInt, &'static str> {
        Err("BigInts have no unsigned right shift, use >> instead")
    }

    pub fn less_than(x: &BigInt, y: &BigInt) -> Option<bool> {
        Some(x < y)
    }

    pub fn equal(x: &BigInt, y: &BigInt) -> bool {
        x == y
    }

    pub fn bitwise_and(x: &BigInt, y: &BigInt) -> BigInt {
        x & y
    }

    pub fn bitwise_xor(x: &BigInt, y: &BigInt) -> BigInt {
        x ^ y
    }

    pub fn bitwise_or(x: &BigInt, y: &BigInt) -> BigInt {
        x | y
    }

    pub fn to_string(x: &BigInt) -> String {
        x.to_string()
    }

    /// Nearest Number to the mathematical value of `x`.
    pub fn to_f64(x: &BigInt) -> f64 {
        x.to_string().parse::<f64>().unwrap_or(f64::NAN)
    }

    /// The BigInt with the same mathematical value as `n`, if `n` is an
    /// integral finite Number.
    pub fn from_integral_f64(n: f64) -> Option<BigInt> {
        if !n.is_finite() || n.fract() != 0.0 {
            return None;
        }
        format!("{n:.0}").parse::<BigInt>().ok()
    }

    /// Compares mathematical values; `None` when `n` is NaN.
    pub fn compare_with_number(x: &BigInt, n: f64) -> Option<Ordering> {
        if n.is_nan() {
            return None;
        }
        if n == f64::INFINITY {
            return Some(Ordering::Less);
        }
        if n == f64::NEG_INFINITY {
            return Some(Ordering::Greater);
        }
        let floor = from_integral_f64(n.floor())?;
        let integral = n.fract() == 0.0;
        Some(match x.cmp(&floor) {
            Ordering::Less => Ordering::Less,
            Ordering::Greater => Ordering::Greater,
            Ordering::Equal if integral => Ordering::Equal,
            Ordering::Equal => Ordering::Less,
        })
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Symbol(s) => write!(f, "{s}"),
            JsValue::BigInt(b) => write!(f, "{}n", b.value),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}
