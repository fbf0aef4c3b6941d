//! Field values and the coercion rules shared by every store
//!
//! Values are plain JSON. A field bag is an insertion-ordered JSON object.

use serde_json::{Map, Number, Value};

/// A single field value
pub type FieldValue = Value;

/// A bag of fields keyed by name
pub type FieldMap = Map<String, Value>;

/// Stringified `undefined` leaking out of view code
pub const UNDEFINED_LITERAL: &str = "undefined";

/// Normalize a value arriving from a view
///
/// A missing value or the literal string `"undefined"` becomes `""`.
/// Everything else, `null` included, is kept as is.
#[must_use]
pub fn normalize_incoming(value: Option<Value>) -> Value {
    match value {
        None => Value::String(String::new()),
        Some(Value::String(s)) if s == UNDEFINED_LITERAL => Value::String(String::new()),
        Some(v) => v,
    }
}

/// True when a value counts as "defined and non-empty" for reads
///
/// `null`, blank strings, empty arrays and empty objects do not.
#[must_use]
pub fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// True when a restored value should be copied into the structured store
///
/// Non-empty strings, non-string scalars and every array qualify. Empty
/// arrays are kept on purpose: they record a list the user cleared.
#[must_use]
pub fn is_restorable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Bool(_) | Value::Number(_) => true,
        Value::Object(map) => !map.is_empty(),
    }
}

/// Numeric reading of a value, `0` when it is not a number
///
/// Strings are trimmed and accept a decimal comma (`"12,5"`).
#[must_use]
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_number(s).unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

/// Parse a numeric string
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// JSON number for `n`, integral when it has no fractional part
#[must_use]
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        #[allow(clippy::cast_possible_truncation)]
        let integral = n as i64;
        return Value::Number(Number::from(integral));
    }
    Number::from_f64(n).map_or(Value::Number(Number::from(0)), Value::Number)
}

/// True when a value is blank or numerically zero
#[must_use]
pub fn is_blank_or_zero(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            let trimmed = s.trim().trim_end_matches('%').trim();
            trimmed.is_empty() || parse_number(trimmed).is_some_and(|n| n == 0.0)
        }
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n == 0.0),
        Some(Value::Bool(b)) => !b,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}
