//! Operator console on stdin.
//!
//! `m` toggles the maintenance hold, `h` toggles the operating-hours
//! override and `s` logs a status line. `p <image.png>` presents a captured
//! photo for validation, `a` accepts it, `r` rejects it and `c` cancels a
//! running submission.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use totem_core::{KioskRuntime, MaintenanceMonitor};

use crate::desk::PhotoDesk;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorKey {
    ToggleHold,
    ToggleHoursOverride,
    Status,
    Present(PathBuf),
    Accept,
    Reject,
    Cancel,
}

impl OperatorKey {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (key, arg) = match line.split_once(char::is_whitespace) {
            Some((key, arg)) => (key, arg.trim()),
            None => (line, ""),
        };

        match (key.to_ascii_lowercase().as_str(), arg) {
            ("m", "") => Some(OperatorKey::ToggleHold),
            ("h", "") => Some(OperatorKey::ToggleHoursOverride),
            ("s", "") => Some(OperatorKey::Status),
            ("p", path) if !path.is_empty() => Some(OperatorKey::Present(PathBuf::from(path))),
            ("a", "") => Some(OperatorKey::Accept),
            ("r", "") => Some(OperatorKey::Reject),
            ("c", "") => Some(OperatorKey::Cancel),
            _ => None,
        }
    }
}

/// Everything the console can act on.
pub struct Operator {
    pub monitor: Arc<MaintenanceMonitor>,
    pub runtime: Arc<KioskRuntime>,
    pub desk: Arc<PhotoDesk>,
}

impl Operator {
    pub async fn handle(&self, key: OperatorKey) {
        match key {
            OperatorKey::ToggleHold => {
                let mode = self.monitor.toggle_hold().await;
                info!(?mode, "Operator toggled maintenance hold");
            }
            OperatorKey::ToggleHoursOverride => {
                self.runtime.toggle_hours_override();
            }
            OperatorKey::Status => {
                let state = self.monitor.state().await;
                info!(
                    mode = ?state.mode,
                    held = state.held,
                    failures = state.consecutive_failures,
                    last_probe = ?state.last_probe,
                    hours_override = self.runtime.hours_override(),
                    photo_pending = self.desk.has_pending(),
                    "Kiosk status"
                );
            }
            OperatorKey::Present(path) => match tokio::fs::read(&path).await {
                Ok(png) => {
                    self.desk.present(png).await;
                }
                Err(e) => warn!(path = %path.display(), "Could not read photo: {}", e),
            },
            OperatorKey::Accept => {
                // Runs in the background so `c` can still cancel it
                let _ = self.desk.accept();
            }
            OperatorKey::Reject => self.desk.reject().await,
            OperatorKey::Cancel => self.desk.cancel(),
        }
    }
}

/// Read operator keys until the input closes.
pub async fn run_console<R>(input: R, operator: Operator)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Operator console read failed: {}", e);
                break;
            }
        };

        match OperatorKey::parse(&line) {
            Some(key) => operator.handle(key).await,
            None if line.trim().is_empty() => {}
            None => warn!(input = line.trim(), "Unknown operator key"),
        }
    }
}
