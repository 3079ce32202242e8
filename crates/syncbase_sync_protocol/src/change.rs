//! Client-submitted change envelopes.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of mutation carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Insert a new record.
    Create,
    /// Modify fields of an existing record.
    Update,
    /// Remove a record and log a tombstone.
    Delete,
}

impl ChangeType {
    /// Returns the wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeType::Create),
            "update" => Ok(ChangeType::Update),
            "delete" => Ok(ChangeType::Delete),
            other => Err(ProtocolError::UnknownChangeType(other.to_string())),
        }
    }
}

/// One field's transition inside an update.
///
/// Only `updated` is applied; `original` is what the client last saw and is
/// kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Value the client last saw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Value>,
    /// New value. `null` clears the column.
    #[serde(default)]
    pub updated: Value,
}

impl FieldChange {
    /// Creates a change from `original` to `updated`.
    pub fn new(original: Value, updated: Value) -> Self {
        Self {
            original: Some(original),
            updated,
        }
    }

    /// Creates a change that only names the new value.
    pub fn to(updated: impl Into<Value>) -> Self {
        Self {
            original: None,
            updated: updated.into(),
        }
    }
}

/// A mutation submitted by a client.
///
/// ```json
/// {
///   "changeType": "update",
///   "kind": "Trip",
///   "recordId": "t1",
///   "fieldChanges": {
///     "version": {"original": 1, "updated": 1},
///     "name": {"original": "Paris", "updated": "Paris 2024"}
///   }
/// }
/// ```
///
/// `changeType` is kept as a string so an unknown type decodes and is then
/// rejected by [`ChangeEnvelope::change_type`] rather than by the JSON layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEnvelope {
    /// Client-assigned change id, echoed in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `create`, `update` or `delete`.
    pub change_type: String,
    /// Entity kind, e.g. `Trip`.
    pub kind: String,
    /// Target record id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// Complete record for a create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_model: Option<Map<String, Value>>,
    /// Per-field transitions for an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_changes: Option<BTreeMap<String, FieldChange>>,
}

impl ChangeEnvelope {
    fn blank(change_type: ChangeType, kind: &str) -> Self {
        Self {
            id: None,
            change_type: change_type.as_str().to_string(),
            kind: kind.to_string(),
            record_id: None,
            full_model: None,
            field_changes: None,
        }
    }

    /// Builds a create envelope. `recordId` is taken from the model's `id`.
    pub fn create(kind: &str, full_model: Map<String, Value>) -> Self {
        let mut envelope = Self::blank(ChangeType::Create, kind);
        envelope.record_id = full_model.get("id").and_then(Value::as_str).map(str::to_string);
        envelope.full_model = Some(full_model);
        envelope
    }

    /// Builds an update envelope.
    pub fn update(kind: &str, record_id: &str, field_changes: BTreeMap<String, FieldChange>) -> Self {
        let mut envelope = Self::blank(ChangeType::Update, kind);
        envelope.record_id = Some(record_id.to_string());
        envelope.field_changes = Some(field_changes);
        envelope
    }

    /// Builds a delete envelope.
    pub fn delete(kind: &str, record_id: &str) -> Self {
        let mut envelope = Self::blank(ChangeType::Delete, kind);
        envelope.record_id = Some(record_id.to_string());
        envelope
    }

    /// Sets the client change id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parses the change type.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownChangeType`] for anything other than
    /// `create`, `update` or `delete`.
    pub fn change_type(&self) -> ProtocolResult<ChangeType> {
        self.change_type.parse()
    }

    /// Decodes an envelope from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encodes the envelope as JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_type_parsing() {
        assert_eq!("create".parse::<ChangeType>().unwrap(), ChangeType::Create);
        assert_eq!("delete".parse::<ChangeType>().unwrap(), ChangeType::Delete);
        assert!(matches!(
            "upsert".parse::<ChangeType>(),
            Err(ProtocolError::UnknownChangeType(t)) if t == "upsert"
        ));
        // Matching is exact.
        assert!("Update".parse::<ChangeType>().is_err());
    }

    #[test]
    fn decode_update_envelope() {
        let body = json!({
            "id": "c-42",
            "changeType": "update",
            "kind": "Trip",
            "recordId": "t1",
            "fieldChanges": {
                "version": {"original": 1, "updated": 1},
                "name": {"original": "Paris", "updated": "Paris 2024"}
            }
        });
        let envelope = ChangeEnvelope::from_json(body.to_string().as_bytes()).unwrap();

        assert_eq!(envelope.id.as_deref(), Some("c-42"));
        assert_eq!(envelope.change_type().unwrap(), ChangeType::Update);
        assert_eq!(envelope.record_id.as_deref(), Some("t1"));
        let changes = envelope.field_changes.unwrap();
        assert_eq!(changes["version"].updated, json!(1));
        assert_eq!(changes["name"].original, Some(json!("Paris")));
        assert!(envelope.full_model.is_none());
    }

    #[test]
    fn unknown_change_type_still_decodes() {
        let body = br#"{"changeType":"merge","kind":"Trip","recordId":"t1"}"#;
        let envelope = ChangeEnvelope::from_json(body).unwrap();
        assert!(envelope.change_type().is_err());
    }

    #[test]
    fn missing_updated_is_null() {
        let change: FieldChange = serde_json::from_str(r#"{"original": "x"}"#).unwrap();
        assert_eq!(change.updated, Value::Null);
    }

    #[test]
    fn create_takes_record_id_from_model() {
        let model = json!({"id": "t1", "name": "Paris"});
        let envelope = ChangeEnvelope::create("Trip", model.as_object().cloned().unwrap());
        assert_eq!(envelope.record_id.as_deref(), Some("t1"));

        let encoded: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(encoded["changeType"], "create");
        assert_eq!(encoded["fullModel"]["name"], "Paris");
        assert!(encoded.get("fieldChanges").is_none());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            ChangeEnvelope::from_json(b"{\"changeType\": "),
            Err(ProtocolError::Json(_))
        ));
    }
}
