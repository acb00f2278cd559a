//! Single-producer, single-consumer hand-off queue.

use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Create a connected sender/queue pair.
pub fn command_channel<T>() -> (CommandSender<T>, CommandQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandQueue { rx })
}

/// Producer half. Deliberately not `Clone`: there is exactly one producer.
#[derive(Debug)]
pub struct CommandSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> CommandSender<T> {
    /// Append a value. Never blocks; a value sent after the consumer is gone
    /// is dropped.
    pub fn enqueue(&self, value: T) {
        if self.tx.send(value).is_err() {
            trace!("Command queue consumer dropped, discarding value");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, polled from the control loop.
#[derive(Debug)]
pub struct CommandQueue<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> CommandQueue<T> {
    /// Take the oldest pending value, if any. Never blocks.
    pub fn dequeue(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Empty the queue and return only the newest value.
    pub fn drain_latest(&mut self) -> Option<T> {
        let mut latest = None;
        let mut dropped = 0usize;
        while let Some(value) = self.dequeue() {
            if latest.replace(value).is_some() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "Superseded commands discarded");
        }
        latest
    }

    /// Number of values waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
