//! In-memory session log sink for testing.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::session::{LogEntry, SessionLogError, SessionLogSink};

/// Sink that keeps every entry it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages of all recorded entries, in order.
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn count(&self, message: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.message == message)
            .count()
    }
}

impl SessionLogSink for RecordingSink {
    fn record(&self, _timestamp: DateTime<Utc>, entry: &LogEntry) -> Result<(), SessionLogError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}
