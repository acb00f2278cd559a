//! Job pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lowest accepted status poll interval (seconds).
pub const MIN_JOB_POLL_INTERVAL_SECS: f64 = 0.1;

/// Configuration for submissions and status polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seconds between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,

    /// Timeout for upload and status requests (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u32,

    /// Consecutive `error` job statuses before escalating to maintenance.
    #[serde(default = "default_threshold")]
    pub job_error_threshold: u32,

    /// Consecutive bad-request poll failures before escalating to maintenance.
    #[serde(default = "default_threshold")]
    pub status_bad_request_threshold: u32,

    /// HTTP status counted against `status_bad_request_threshold`.
    #[serde(default = "default_bad_request_status")]
    pub bad_request_status: u16,

    /// Workflow name sent with every upload.
    #[serde(default = "default_workflow")]
    pub workflow: String,

    /// Target of the pre-flight connectivity check.
    #[serde(default = "default_connectivity_url")]
    pub connectivity_url: String,

    /// Timeout for the connectivity check (seconds).
    #[serde(default = "default_connectivity_timeout")]
    pub connectivity_timeout_secs: u32,
}

fn default_poll_interval() -> f64 {
    1.0
}

fn default_request_timeout() -> u32 {
    30
}

fn default_threshold() -> u32 {
    3
}

fn default_bad_request_status() -> u16 {
    400
}

fn default_workflow() -> String {
    "default".to_string()
}

fn default_connectivity_url() -> String {
    "http://clients3.google.com/generate_204".to_string()
}

fn default_connectivity_timeout() -> u32 {
    3
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs.max(0.0))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs as u64)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs as u64)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            job_error_threshold: default_threshold(),
            status_bad_request_threshold: default_threshold(),
            bad_request_status: default_bad_request_status(),
            workflow: default_workflow(),
            connectivity_url: default_connectivity_url(),
            connectivity_timeout_secs: default_connectivity_timeout(),
        }
    }
}
