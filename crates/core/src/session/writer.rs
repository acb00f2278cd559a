use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

use super::{LogEntry, LogEnvelope, LogLevel, SessionLogHandle};

/// Errors reported by a log sink.
#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("Sink error: {0}")]
    Sink(String),
}

/// The external log collaborator.
///
/// Persistence format is up to the implementation.
pub trait SessionLogSink: Send + Sync {
    fn record(&self, timestamp: DateTime<Utc>, entry: &LogEntry) -> Result<(), SessionLogError>;
}

/// Sink that forwards entries to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl SessionLogSink for TracingSink {
    fn record(&self, timestamp: DateTime<Utc>, entry: &LogEntry) -> Result<(), SessionLogError> {
        let tags = entry.tags.join(",");
        match entry.level {
            LogLevel::Debug => tracing::debug!(target: "totem::session", %timestamp, tags = %tags, data = %entry.data, "{}", entry.message),
            LogLevel::Info => tracing::info!(target: "totem::session", %timestamp, tags = %tags, data = %entry.data, "{}", entry.message),
            LogLevel::Warning => tracing::warn!(target: "totem::session", %timestamp, tags = %tags, data = %entry.data, "{}", entry.message),
            LogLevel::Error => tracing::error!(target: "totem::session", %timestamp, tags = %tags, data = %entry.data, "{}", entry.message),
        }
        Ok(())
    }
}

/// Background task that receives kiosk events and hands them to the sink
pub struct SessionLogWriter {
    rx: mpsc::Receiver<LogEnvelope>,
    sink: Arc<dyn SessionLogSink>,
}

impl SessionLogWriter {
    pub fn new(rx: mpsc::Receiver<LogEnvelope>, sink: Arc<dyn SessionLogSink>) -> Self {
        Self { rx, sink }
    }

    /// Run the writer, consuming events until every handle is dropped
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::debug!("Session log writer started");

        while let Some(envelope) = self.rx.recv().await {
            let entry = envelope.event.to_entry();
            if let Err(e) = self.sink.record(envelope.timestamp, &entry) {
                tracing::error!("Failed to write session event: {}", e);
            }
        }

        tracing::debug!("Session log writer shutting down");
    }
}

/// Create a complete session log
///
/// Returns:
/// - `SessionLogHandle` - for emitting events (clone this to share across tasks)
/// - `SessionLogWriter` - spawn this with `tokio::spawn(writer.run())`
pub fn create_session_log(
    sink: Arc<dyn SessionLogSink>,
    buffer_size: usize,
) -> (SessionLogHandle, SessionLogWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (SessionLogHandle::new(tx), SessionLogWriter::new(rx, sink))
}
