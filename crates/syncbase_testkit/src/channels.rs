//! In-process live channels.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use syncbase_sync_server::{ChannelError, LiveChannel};

/// A live channel that records every frame it receives.
///
/// Can be told to fail its next sends, to exercise drop-on-error.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    frames: Mutex<Vec<String>>,
    failing: AtomicBool,
    closed: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingChannel {
    /// Creates a healthy channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel whose sends fail.
    pub fn failing() -> Self {
        let channel = Self::default();
        channel.set_failing(true);
        channel
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every frame received, oldest first.
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    /// Returns every frame parsed as JSON.
    pub fn notifications(&self) -> Vec<Value> {
        self.frames
            .lock()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }

    /// Number of send attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns true once the registry has closed the channel.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl LiveChannel for RecordingChannel {
    fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChannelError::Send("injected failure".into()));
        }
        self.frames.lock().push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
