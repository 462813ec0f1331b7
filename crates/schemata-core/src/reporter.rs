//! Sinks for operator-facing warnings.
//!
//! The engine never logs advisory warnings directly; it hands the exact
//! text to a [`Reporter`] supplied at construction.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

/// Receives warning text produced while diffing.
pub trait Reporter: Send + Sync {
    /// Reports one warning. `message` is the complete text, trailing
    /// newline included.
    fn warn(&self, message: &str);
}

impl<T: Reporter + ?Sized> Reporter for &T {
    fn warn(&self, message: &str) {
        (**self).warn(message);
    }
}

impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    fn warn(&self, message: &str) {
        (**self).warn(message);
    }
}

/// Forwards warnings to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warn(&self, message: &str) {
        warn!("{}", message.trim_end_matches('\n'));
    }
}

/// Discards every warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn warn(&self, _message: &str) {}
}

/// Keeps every warning in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the warnings received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Reporter for RecordingReporter {
    fn warn(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_through_arc() {
        let recorder = Arc::new(RecordingReporter::new());
        let shared: Arc<dyn Reporter> = recorder.clone();
        shared.warn("first\n");
        recorder.warn("second\n");
        assert_eq!(recorder.messages(), vec!["first\n", "second\n"]);
    }
}
