//! Encoding of client-supplied JSON values for storage.

use crate::error::CodecResult;
use crate::value::RawValue;
use serde_json::Value;

/// Converts a JSON field value from a change envelope into a storable value.
///
/// Scalars map onto their native representation. Arrays and objects are
/// serialized to JSON text; a JSON column stores that text as bytes and the
/// materializer decodes it back on read.
pub fn encode_field_value(value: &Value) -> CodecResult<RawValue> {
    Ok(match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RawValue::Integer(i),
            // u64 beyond i64::MAX and real numbers both land here
            None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => RawValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => RawValue::Text(serde_json::to_string(value)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(encode_field_value(&json!(null)).unwrap(), RawValue::Null);
        assert_eq!(encode_field_value(&json!(5)).unwrap(), RawValue::Integer(5));
        assert_eq!(encode_field_value(&json!(1.25)).unwrap(), RawValue::Float(1.25));
        assert_eq!(encode_field_value(&json!(true)).unwrap(), RawValue::Bool(true));
        assert_eq!(
            encode_field_value(&json!("Paris")).unwrap(),
            RawValue::Text("Paris".into())
        );
    }

    #[test]
    fn lists_become_json_text() {
        assert_eq!(
            encode_field_value(&json!(["c1", "c2"])).unwrap(),
            RawValue::Text(r#"["c1","c2"]"#.into())
        );
    }

    #[test]
    fn objects_become_json_text() {
        assert_eq!(
            encode_field_value(&json!({"lat": 1})).unwrap(),
            RawValue::Text(r#"{"lat":1}"#.into())
        );
    }
}
