//! Classification of raw column values.

use crate::value::RawValue;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// A column value after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Any finite number.
    Number(Number),
    /// Boolean.
    Boolean(bool),
    /// Timestamp, rendered as RFC 3339 on the wire.
    Timestamp(DateTime<Utc>),
    /// Decoded JSON payload.
    Structured(Value),
    /// Anything that did not classify as one of the above.
    Text(String),
}

impl TypedValue {
    /// Converts into the JSON value emitted on the wire.
    pub fn into_json(self) -> Value {
        match self {
            TypedValue::Number(n) => Value::Number(n),
            TypedValue::Boolean(b) => Value::Bool(b),
            TypedValue::Timestamp(t) => {
                Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TypedValue::Structured(v) => v,
            TypedValue::Text(s) => Value::String(s),
        }
    }
}

/// Classifies one raw value.
///
/// Returns `None` for values that must be left out of a record: SQL `NULL`
/// and byte payloads that decode to JSON `null`. Classification never fails;
/// anything ambiguous becomes [`TypedValue::Text`].
pub fn classify(raw: &RawValue) -> Option<TypedValue> {
    match raw {
        RawValue::Null => None,
        RawValue::Integer(i) => Some(TypedValue::Number(Number::from(*i))),
        RawValue::Float(f) => Some(match Number::from_f64(*f) {
            Some(n) => TypedValue::Number(n),
            None => TypedValue::Text(f.to_string()),
        }),
        RawValue::Bool(b) => Some(TypedValue::Boolean(*b)),
        RawValue::Timestamp(t) => Some(TypedValue::Timestamp(*t)),
        RawValue::Bytes(bytes) => classify_bytes(bytes),
        RawValue::Text(text) => Some(classify_text(text)),
    }
}

fn classify_bytes(bytes: &[u8]) -> Option<TypedValue> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Null) => None,
        Ok(value) => Some(TypedValue::Structured(value)),
        Err(_) => Some(TypedValue::Text(String::from_utf8_lossy(bytes).into_owned())),
    }
}

fn classify_text(text: &str) -> TypedValue {
    if let Some(n) = parse_number(text) {
        return TypedValue::Number(n);
    }
    if let Some(b) = parse_bool(text) {
        return TypedValue::Boolean(b);
    }
    TypedValue::Text(text.to_string())
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    // from_f64 rejects NaN and infinities, which keeps "inf" and "NaN" as text.
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
