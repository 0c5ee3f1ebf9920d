use super::*;
use num_bigint::BigInt;

pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

/// Number::toString(x, radix) for radix != 10.
pub(crate) fn format_radix(n: f64, radix: u32) -> String {
    if !n.is_finite() || radix == 10 || !(2..=36).contains(&radix) {
        return number_ops::to_string(n);
    }
    let negative = n < 0.0;
    let n = n.abs();
    let mut int_part = n.trunc();
    let mut frac = n - int_part;

    let mut digits = Vec::new();
    if int_part == 0.0 {
        digits.push('0');
    }
    while int_part >= 1.0 {
        let d = (int_part % f64::from(radix)) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        int_part = (int_part / f64::from(radix)).trunc();
    }
    if negative {
        digits.push('-');
    }
    let mut out: String = digits.iter().rev().collect();

    if frac > 0.0 {
        out.push('.');
        // 52 fraction digits exhaust the mantissa in base 2
        for _ in 0..52 {
            frac *= f64::from(radix);
            let d = frac.trunc() as u32;
            out.push(char::from_digit(d, radix).unwrap_or('0'));
            frac -= f64::from(d);
            if frac == 0.0 {
                break;
            }
        }
    }
    out
}

// §7.1.2 ToBoolean
pub fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::BigInt(b) => b.value.sign() != num_bigint::Sign::NoSign,
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

/// WhiteSpace and LineTerminator code points, as StringToNumber trims them.
fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{FEFF}'
            | '\u{000A}'
            | '\u{000D}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

fn trim_js_whitespace(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

/// Splits off a `0x`/`0o`/`0b` prefix.
fn non_decimal_prefix(s: &str) -> Option<(u32, &str)> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return None;
    }
    let radix = match bytes[1] {
        b'x' | b'X' => 16,
        b'o' | b'O' => 8,
        b'b' | b'B' => 2,
        _ => return None,
    };
    Some((radix, &s[2..]))
}

fn parse_radix_digits(digits: &str, radix: u32) -> Option<BigInt> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

/// StrUnsignedDecimalLiteral without `Infinity`.
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - frac_start;
    }
    if mantissa_digits == 0 {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

// §7.1.4.1.1 StringToNumber
pub(crate) fn string_to_number(s: &JsString) -> f64 {
    let rust_str = s.to_rust_string();
    let trimmed = trim_js_whitespace(&rust_str);
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some((radix, digits)) = non_decimal_prefix(trimmed) {
        return parse_radix_digits(digits, radix)
            .map(|n| bigint_ops::to_f64(&n))
            .unwrap_or(f64::NAN);
    }
    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_decimal_literal(unsigned) {
        return f64::NAN;
    }
    unsigned
        .parse::<f64>()
        .map(|n| sign * n)
        .unwrap_or(f64::NAN)
}

// §7.1.14 StringToBigInt
pub(crate) fn string_to_bigint(s: &JsString) -> Option<BigInt> {
    let rust_str = s.to_rust_string();
    let trimmed = trim_js_whitespace(&rust_str);
    if trimmed.is_empty() {
        return Some(BigInt::from(0));
    }
    if let Some((radix, digits)) = non_decimal_prefix(trimmed) {
        return parse_radix_digits(digits, radix);
    }
    let (negative, digits) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let n = parse_radix_digits(digits, 10)?;
    Some(if negative { -n } else { n })
}

// §7.2.10 SameValue
pub fn same_value(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
        _ => is_strictly_equal(left, right),
    }
}

// §7.2.11 SameValueZero
pub fn same_value_zero(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value_zero(*a, *b),
        _ => is_strictly_equal(left, right),
    }
}

// §7.2.15 IsStrictlyEqual
pub fn is_strictly_equal(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::equal(*a, *b),
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => bigint_ops::equal(&a.value, &b.value),
        (JsValue::Object(a), JsValue::Object(b)) => a == b,
        _ => false,
    }
}

/// `typeof` for everything but callables, which need the heap.
pub(crate) fn type_tag(val: &JsValue) -> &'static str {
    match val {
        JsValue::Undefined => "undefined",
        JsValue::Null | JsValue::Object(_) => "object",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Symbol(_) => "symbol",
        JsValue::BigInt(_) => "bigint",
    }
}

/// Short rendering of a value for error messages that have no source text
/// to quote.
pub(crate) fn describe_value(val: &JsValue) -> String {
    match val {
        JsValue::String(s) => format!("\"{s}\""),
        JsValue::Object(_) => "object".to_string(),
        other => other.to_string(),
    }
}

impl Interpreter {
    pub fn typeof_value(&self, val: &JsValue) -> &'static str {
        if self.is_callable(val) {
            "function"
        } else {
            type_tag(val)
        }
    }
}
