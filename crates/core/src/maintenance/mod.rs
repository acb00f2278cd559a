//! Maintenance monitor.
//!
//! Periodically probes server health and arbitrates between the normal
//! screen flow and the maintenance screen:
//! - **Probe loop**: fixed interval, re-armed after every probe, cancellable
//! - **Escalation**: the job pipeline forces maintenance through [`MaintenanceTrigger`]
//! - **Hold**: a sticky operator flag that suppresses automatic recovery

mod config;
mod monitor;
mod probe;
mod types;

pub use config::{MonitorConfig, MIN_POLL_INTERVAL_SECS};
pub use monitor::MaintenanceMonitor;
pub use probe::{classify_status, HealthProbe, HttpHealthProbe};
pub use types::{MaintenanceMode, MaintenanceState, MaintenanceTrigger, ProbeOutcome};
