use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::KioskEvent;

/// Envelope wrapping a kiosk event with metadata
#[derive(Debug, Clone)]
pub struct LogEnvelope {
    pub timestamp: DateTime<Utc>,
    /// Identifies the process run that produced the event.
    pub run_id: Uuid,
    pub event: KioskEvent,
}

/// Handle for emitting kiosk events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through a bounded channel to be written by the SessionLogWriter.
#[derive(Clone)]
pub struct SessionLogHandle {
    tx: mpsc::Sender<LogEnvelope>,
    run_id: Uuid,
}

impl SessionLogHandle {
    /// Create a new handle from a channel sender
    pub fn new(tx: mpsc::Sender<LogEnvelope>) -> Self {
        Self {
            tx,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn envelope(&self, event: KioskEvent) -> LogEnvelope {
        LogEnvelope {
            timestamp: Utc::now(),
            run_id: self.run_id,
            event,
        }
    }

    /// Emit an event, waiting for channel capacity.
    ///
    /// A closed channel is logged; the caller is never failed.
    pub async fn emit(&self, event: KioskEvent) {
        if let Err(e) = self.tx.send(self.envelope(event)).await {
            tracing::error!("Failed to emit session event: {}", e);
        }
    }

    /// Try to emit an event without blocking
    ///
    /// Returns true if the event was queued.
    pub fn try_emit(&self, event: KioskEvent) -> bool {
        match self.tx.try_send(self.envelope(event)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit session event: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_event() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = SessionLogHandle::new(tx);

        handle
            .emit(KioskEvent::ScreenOpened {
                screen: "cta".to_string(),
            })
            .await;

        let envelope = rx.recv().await.expect("Should receive event");
        assert!(matches!(envelope.event, KioskEvent::ScreenOpened { .. }));
        assert_eq!(envelope.run_id, handle.run_id());
    }

    #[test]
    fn test_clones_share_run_id() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = SessionLogHandle::new(tx);
        let clone = handle.clone();

        assert!(handle.try_emit(KioskEvent::MaintenanceExited));
        assert!(clone.try_emit(KioskEvent::MaintenanceExited));

        let first = rx.try_recv().expect("first event");
        let second = rx.try_recv().expect("second event");
        assert_eq!(first.run_id, second.run_id);
    }

    #[test]
    fn test_try_emit_full_channel() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = SessionLogHandle::new(tx);

        assert!(handle.try_emit(KioskEvent::MaintenanceExited));
        // Second should fail (channel full)
        assert!(!handle.try_emit(KioskEvent::MaintenanceExited));
    }

    #[tokio::test]
    async fn test_emit_closed_channel() {
        let (tx, rx) = mpsc::channel::<LogEnvelope>(10);
        let handle = SessionLogHandle::new(tx);
        drop(rx);

        // Logged, not panicking
        handle
            .emit(KioskEvent::ServiceStopped {
                reason: "test".to_string(),
            })
            .await;
    }
}
