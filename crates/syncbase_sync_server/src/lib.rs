//! # SyncBase Sync Server
//!
//! The synchronization and conflict-resolution engine.
//!
//! This crate provides:
//! - Full and delta snapshots with tombstone-based deletion propagation
//! - Change application with version-based last-writer-wins resolution
//! - Live fan-out of confirmed changes over WebSocket channels
//!
//! # Architecture
//!
//! ```text
//! client ── snapshot ──▶ SnapshotBuilder ──┐
//!                                           ├── TableStore
//! client ── change ────▶ MutationApplier ──┘
//!                              │
//!                              ▼
//!                       ChannelRegistry ──▶ every live channel
//! ```
//!
//! A client bootstraps with a full snapshot, then asks for deltas using the
//! snapshot's watermark. It opens a live channel and submits its mutations;
//! every confirmed mutation is pushed to all live channels, the submitter's
//! included.
//!
//! # Consistency
//!
//! - There is no transaction across apply, record and broadcast. A failure
//!   midway is surfaced, never rolled back.
//! - Conflicts resolve by version counter only: `max(server, client) + 1`.
//! - Broadcast is best effort. A channel that fails a send is dropped.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod applier;
mod broadcast;
mod config;
mod error;
mod live;
mod server;
mod snapshot;

pub use applier::{MutationApplier, MutationOutcome};
pub use broadcast::{BroadcastReport, ChannelError, ChannelId, ChannelRegistry, LiveChannel};
pub use config::{KindSchema, ServerConfig, DEFAULT_KINDS, DEFAULT_MAX_ENVELOPE_BYTES};
pub use error::{ServerError, ServerResult};
pub use live::{serve_live_connection, LiveListener, WsChannel};
pub use server::SyncServer;
pub use snapshot::SnapshotBuilder;
