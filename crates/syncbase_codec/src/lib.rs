//! # SyncBase Codec
//!
//! Schema-less decoding of persisted rows into wire records.
//!
//! Entity kinds are configured by name, so column types are never known at
//! compile time. Every value a store cursor yields is classified by
//! inspection instead:
//!
//! 1. native numbers, booleans and timestamps pass through unchanged
//! 2. byte payloads are decoded as JSON, falling back to a string
//! 3. text is parsed as a number, then as a boolean, else kept as text
//!
//! `NULL` columns never appear in the output. Clients rely on the absence of
//! a key to tell "unset" apart from "explicitly cleared".
//!
//! ## Usage
//!
//! ```
//! use syncbase_codec::{Materializer, RawValue};
//!
//! let columns = vec!["id".to_string(), "name".to_string(), "notes".to_string()];
//! let row = vec![RawValue::from("t1"), RawValue::from("Paris"), RawValue::Null];
//!
//! let record = Materializer::new("trip").materialize_row(&columns, &row).unwrap();
//! assert_eq!(record.kind(), Some("Trip"));
//! assert!(!record.contains("notes"));
//! ```
//!
//! This is a pure crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encoder;
mod error;
mod materializer;
mod record;
mod typed;
mod value;

pub use encoder::encode_field_value;
pub use error::{CodecError, CodecResult};
pub use materializer::Materializer;
pub use record::{kind_tag, EntityRecord, ID_FIELD, KIND_FIELD, LAST_MODIFIED_FIELD, VERSION_FIELD};
pub use typed::{classify, TypedValue};
pub use value::RawValue;
