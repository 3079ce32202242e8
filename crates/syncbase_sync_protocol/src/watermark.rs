//! Delta cursor handling.
//!
//! Snapshots report their watermark as an RFC 3339 string with millisecond
//! precision. Clients send it back as epoch milliseconds. Truncating to
//! milliseconds can only move the cursor backwards, so a record may be
//! delivered twice but never skipped.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a server time as a snapshot watermark.
pub fn format_watermark(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts a client's epoch-millisecond cursor into a server time.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidCursor`] if the value is out of range.
pub fn parse_delta_cursor(epoch_ms: i64) -> ProtocolResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(epoch_ms).ok_or(ProtocolError::InvalidCursor(epoch_ms))
}

/// Converts a watermark string into the epoch-millisecond cursor a client
/// sends for its next delta.
pub fn watermark_to_cursor(watermark: &str) -> ProtocolResult<i64> {
    DateTime::parse_from_rfc3339(watermark)
        .map(|t| t.timestamp_millis())
        .map_err(|_| ProtocolError::InvalidWatermark(watermark.to_string()))
}
