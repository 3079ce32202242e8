//! Server-to-client change messages.

use crate::change::ChangeType;
use crate::error::ProtocolResult;
use serde::{Deserialize, Serialize};
use syncbase_codec::EntityRecord;

/// A confirmed change, pushed to every live channel.
///
/// The submitter receives its own changes too; clients drop echoes by
/// `recordId` and version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    /// What happened.
    pub change_type: ChangeType,
    /// Entity kind tag.
    pub kind: String,
    /// Affected record id.
    pub record_id: String,
    /// The record after the change, or `{id, kind}` for a delete.
    pub record: EntityRecord,
}

impl ChangeNotification {
    /// Creates a notification.
    pub fn new(change_type: ChangeType, kind: impl Into<String>, record_id: impl Into<String>, record: EntityRecord) -> Self {
        Self {
            change_type,
            kind: kind.into(),
            record_id: record_id.into(),
            record,
        }
    }

    /// Serializes the notification as a JSON text frame.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Response body for a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    /// Id of the deleted (or already absent) record.
    pub id: String,
}

/// Response body for an applied change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeResponse {
    /// The full record after a create or update.
    Record(EntityRecord),
    /// Acknowledgement of a delete.
    Deleted(DeleteAck),
}

impl ChangeResponse {
    /// Returns the record, if this is a create or update response.
    pub fn record(&self) -> Option<&EntityRecord> {
        match self {
            ChangeResponse::Record(record) => Some(record),
            ChangeResponse::Deleted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn notification_wire_shape() {
        let mut record = EntityRecord::new("Trip");
        record.insert("id", json!("t1"));
        record.insert("version", json!(2));
        let notification = ChangeNotification::new(ChangeType::Update, "Trip", "t1", record);

        let wire: Value = serde_json::from_str(&notification.to_json().unwrap()).unwrap();
        assert_eq!(
            wire,
            json!({
                "changeType": "update",
                "kind": "Trip",
                "recordId": "t1",
                "record": {"id": "t1", "version": 2, "kind": "Trip"}
            })
        );
    }

    #[test]
    fn responses_serialize_flat() {
        let ack = ChangeResponse::Deleted(DeleteAck { id: "t1".into() });
        assert_eq!(serde_json::to_value(&ack).unwrap(), json!({"id": "t1"}));

        let record = ChangeResponse::Record(EntityRecord::minimal("Trip", "t1"));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"kind": "Trip", "id": "t1"})
        );
        assert!(record.record().is_some());
        assert!(ack.record().is_none());
    }
}
