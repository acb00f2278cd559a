//! Maintenance monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lowest accepted probe interval (seconds).
pub const MIN_POLL_INTERVAL_SECS: f64 = 0.5;

/// Configuration for the maintenance monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds to wait after each probe before the next one.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,

    /// Per-probe timeout (seconds, 1-60). Exceeding it counts as unreachable.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u32,

    /// Status code that means the server is healthy.
    #[serde(default = "default_healthy_status")]
    pub healthy_status: u16,

    /// Status code the server uses to report that its upstream is unhealthy.
    #[serde(default = "default_degraded_status")]
    pub degraded_status: u16,
}

fn default_poll_interval() -> f64 {
    5.0
}

fn default_request_timeout() -> u32 {
    5
}

fn default_healthy_status() -> u16 {
    200
}

fn default_degraded_status() -> u16 {
    400
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs.max(0.0))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs as u64)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            healthy_status: default_healthy_status(),
            degraded_status: default_degraded_status(),
        }
    }
}
