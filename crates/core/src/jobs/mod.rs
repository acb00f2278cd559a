//! Photo submission and job polling.
//!
//! A submission uploads one PNG to the job server, polls the returned
//! request id until the job reaches a terminal state, and hands the result
//! image to the thank-you screen. Repeated server-side failures escalate to
//! maintenance through [`MaintenanceTrigger`](crate::maintenance::MaintenanceTrigger);
//! the kiosk's own connectivity losses never do.

mod client;
mod config;
mod connectivity;
mod pipeline;
mod types;

pub use client::HttpJobServer;
pub use config::{PipelineConfig, MIN_JOB_POLL_INTERVAL_SECS};
pub use connectivity::HttpConnectivity;
pub use pipeline::JobPipeline;
pub use types::*;
