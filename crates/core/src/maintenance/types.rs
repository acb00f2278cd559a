//! Types for the maintenance monitor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of one health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Network failure, DNS failure or timeout.
    Unreachable,
    /// The designated success status.
    Healthy,
    /// The designated status for an unhealthy upstream.
    Degraded,
    /// Any other status; state is left unchanged.
    Unhandled(u16),
}

impl ProbeOutcome {
    /// Whether this outcome pushes a normal kiosk into maintenance.
    pub fn is_failure(&self) -> bool {
        matches!(self, ProbeOutcome::Unreachable | ProbeOutcome::Degraded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Unreachable => "unreachable",
            ProbeOutcome::Healthy => "healthy",
            ProbeOutcome::Degraded => "degraded",
            ProbeOutcome::Unhandled(_) => "unhandled",
        }
    }
}

/// The two primary monitor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceMode {
    Normal,
    Maintenance,
}

/// Point-in-time view of the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceState {
    pub mode: MaintenanceMode,
    /// Whether the maintenance screen is the visible screen.
    pub active: bool,
    /// Sticky operator hold.
    pub held: bool,
    /// Failed probes in a row; reset by a healthy probe.
    pub consecutive_failures: u32,
    pub last_probe: Option<ProbeOutcome>,
}

/// Something that can force the kiosk into maintenance.
///
/// The job pipeline escalates through this and never touches the hold flag.
#[async_trait]
pub trait MaintenanceTrigger: Send + Sync {
    async fn activate_maintenance(&self);
}
