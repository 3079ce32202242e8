//! # SyncBase Sync Protocol
//!
//! Wire types exchanged between SyncBase clients and the sync server.
//!
//! This crate provides:
//! - [`ChangeEnvelope`] for client-submitted mutations
//! - [`ChangeNotification`] for live fan-out of confirmed changes
//! - [`Snapshot`] and [`Tombstone`] for full and delta bootstrap
//! - Watermark helpers for the delta cursor
//!
//! Everything is JSON with camelCase field names.
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod error;
mod notification;
mod snapshot;
mod watermark;

pub use change::{ChangeEnvelope, ChangeType, FieldChange};
pub use error::{ProtocolError, ProtocolResult};
pub use notification::{ChangeNotification, ChangeResponse, DeleteAck};
pub use snapshot::{KindFailure, Snapshot, Tombstone};
pub use watermark::{format_watermark, parse_delta_cursor, watermark_to_cursor};
