//! # SyncBase Testkit
//!
//! Test utilities for SyncBase.
//!
//! This crate provides:
//! - [`TestServer`], a sync server over an in-memory or temporary file store
//!   driven by a manual clock
//! - [`RecordingChannel`], a live channel that keeps every frame it receives
//! - [`FaultyStore`], a store wrapper that fails chosen operations
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use syncbase_testkit::prelude::*;
//!
//! let server = TestServer::new();
//! let channel = server.connect();
//! server.create("Trip", serde_json::json!({"id": "t1", "name": "Paris"})).unwrap();
//! assert_eq!(channel.frames().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod channels;
pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::channels::*;
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use channels::*;
pub use faults::*;
pub use fixtures::*;
pub use generators::*;
