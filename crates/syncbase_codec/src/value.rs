//! Untyped column values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A column value exactly as a store cursor hands it over.
///
/// The store decides the representation (a JSON column comes back as
/// [`RawValue::Bytes`], a text column as [`RawValue::Text`], and so on);
/// nothing about the entity kind is known at this level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    /// SQL `NULL`.
    Null,
    /// Signed integer.
    Integer(i64),
    /// Double-precision float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Timestamp in UTC.
    Timestamp(DateTime<Utc>),
    /// Opaque byte payload (blob or JSON column).
    Bytes(Vec<u8>),
    /// Text.
    Text(String),
}

impl RawValue {
    /// Returns true for `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Returns the integer, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is one.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            RawValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Bool(_) => "boolean",
            RawValue::Timestamp(_) => "timestamp",
            RawValue::Bytes(_) => "bytes",
            RawValue::Text(_) => "text",
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(v)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(v: DateTime<Utc>) -> Self {
        RawValue::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert!(RawValue::Null.is_null());
        assert_eq!(RawValue::from(7i64).as_integer(), Some(7));
        assert_eq!(RawValue::from("x").as_text(), Some("x"));
        assert_eq!(RawValue::from(true).as_integer(), None);
    }

    #[test]
    fn type_names() {
        assert_eq!(RawValue::Float(1.5).type_name(), "float");
        assert_eq!(RawValue::Bytes(vec![]).type_name(), "bytes");
    }
}
