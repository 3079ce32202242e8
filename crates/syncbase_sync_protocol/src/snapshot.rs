//! Full and delta snapshots.

use crate::error::ProtocolResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syncbase_codec::EntityRecord;

/// A deletion log entry as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    /// Id of the deleted record.
    pub id: String,
    /// When the deletion was recorded.
    pub deleted_time: DateTime<Utc>,
    /// Entity kind of the deleted record.
    pub kind: String,
}

/// A kind that could not be read while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindFailure {
    /// The entity kind.
    pub kind: String,
    /// Why it failed.
    pub error: String,
}

/// State handed to a client at connect time.
///
/// `watermark` is the server clock at construction time; the client sends it
/// back (as epoch milliseconds) to request the next delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Materialized records in kind-list order.
    pub records: Vec<EntityRecord>,
    /// Deletions since the requested cursor. Always empty for a full snapshot.
    pub tombstones: Vec<Tombstone>,
    /// ISO-8601 server time of this snapshot.
    pub watermark: String,
    /// Kinds whose rows are missing from `records`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_kinds: Vec<KindFailure>,
}

impl Snapshot {
    /// Returns true if every kind was read.
    pub fn is_complete(&self) -> bool {
        self.failed_kinds.is_empty()
    }

    /// Serializes the snapshot as JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn snapshot() -> Snapshot {
        Snapshot {
            records: vec![EntityRecord::minimal("Trip", "t1")],
            tombstones: vec![Tombstone {
                id: "t0".into(),
                deleted_time: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                kind: "Trip".into(),
            }],
            watermark: "2024-01-02T03:04:06.000Z".into(),
            failed_kinds: vec![],
        }
    }

    #[test]
    fn complete_snapshot_omits_failures() {
        let wire: Value = serde_json::from_str(&snapshot().to_json().unwrap()).unwrap();
        assert!(wire.get("failedKinds").is_none());
        assert_eq!(wire["tombstones"][0]["deletedTime"], "2024-01-02T03:04:05Z");
        assert_eq!(wire["watermark"], "2024-01-02T03:04:06.000Z");
    }

    #[test]
    fn partial_snapshot_reports_failures() {
        let mut partial = snapshot();
        partial.failed_kinds.push(KindFailure {
            kind: "User".into(),
            error: "unknown table: user".into(),
        });
        assert!(!partial.is_complete());

        let wire = serde_json::to_value(&partial).unwrap();
        assert_eq!(
            wire["failedKinds"],
            json!([{"kind": "User", "error": "unknown table: user"}])
        );

        let back: Snapshot = serde_json::from_value(wire).unwrap();
        assert_eq!(back, partial);
    }
}
