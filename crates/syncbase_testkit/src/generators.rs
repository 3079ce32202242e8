//! Property-based test generators using proptest.
//!
//! Provides strategies for random sequences of client changes against the
//! `Trip` kind.

use crate::fixtures::TestServer;
use proptest::prelude::*;
use serde_json::json;
use syncbase_sync_protocol::ChangeResponse;
use syncbase_sync_server::ServerResult;

/// Strategy for record ids drawn from a small pool, so sequences revisit ids.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["t1", "t2", "t3", "t4"]).prop_map(|s| s.to_string())
}

/// Strategy for display names that always read back as text.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,8} [a-z]{2,6}").expect("Invalid regex")
}

/// One client change against the `Trip` kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TripOp {
    /// Create `id` with `name`.
    Create {
        /// Record id.
        id: String,
        /// Trip name.
        name: String,
    },
    /// Rename `id`, claiming `client_version` as last seen.
    Update {
        /// Record id.
        id: String,
        /// Version the client claims to have seen.
        client_version: i64,
        /// New trip name.
        name: String,
    },
    /// Delete `id`.
    Delete {
        /// Record id.
        id: String,
    },
}

impl TripOp {
    /// Submits the change to a test server.
    pub fn apply(&self, server: &TestServer) -> ServerResult<ChangeResponse> {
        match self {
            TripOp::Create { id, name } => server.create("Trip", json!({"id": id, "name": name})),
            TripOp::Update {
                id,
                client_version,
                name,
            } => server.update("Trip", id, *client_version, json!({"name": name})),
            TripOp::Delete { id } => server.delete("Trip", id),
        }
    }

    /// The record id the change targets.
    pub fn id(&self) -> &str {
        match self {
            TripOp::Create { id, .. } | TripOp::Update { id, .. } | TripOp::Delete { id } => id,
        }
    }
}

/// Strategy for a single [`TripOp`].
pub fn trip_op_strategy() -> impl Strategy<Value = TripOp> {
    prop_oneof![
        3 => (record_id_strategy(), name_strategy())
            .prop_map(|(id, name)| TripOp::Create { id, name }),
        4 => (record_id_strategy(), 0i64..8, name_strategy()).prop_map(|(id, client_version, name)| {
            TripOp::Update {
                id,
                client_version,
                name,
            }
        }),
        2 => record_id_strategy().prop_map(|id| TripOp::Delete { id }),
    ]
}

/// Strategy for a sequence of [`TripOp`]s.
pub fn trip_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<TripOp>> {
    prop::collection::vec(trip_op_strategy(), 1..max_len.max(2))
}
