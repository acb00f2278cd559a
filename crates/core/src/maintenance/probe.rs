//! Health probes.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::config::MonitorConfig;
use super::types::ProbeOutcome;

/// A single health check against the job server.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> ProbeOutcome;
}

/// Map an HTTP status to a probe outcome.
pub fn classify_status(status: u16, healthy: u16, degraded: u16) -> ProbeOutcome {
    if status == healthy {
        ProbeOutcome::Healthy
    } else if status == degraded {
        ProbeOutcome::Degraded
    } else {
        ProbeOutcome::Unhandled(status)
    }
}

/// `GET <server url>` with a hard timeout.
pub struct HttpHealthProbe {
    client: Client,
    url: String,
    healthy_status: u16,
    degraded_status: u16,
}

impl HttpHealthProbe {
    pub fn new(url: impl Into<String>, config: &MonitorConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            url: url.into(),
            healthy_status: config.healthy_status,
            degraded_status: config.degraded_status,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self) -> ProbeOutcome {
        debug!(url = %self.url, "Probing server health");

        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(status, "Health probe response");
                classify_status(status, self.healthy_status, self.degraded_status)
            }
            Err(e) => {
                warn!(
                    url = %self.url,
                    timeout = e.is_timeout(),
                    "Health probe failed: {}",
                    e
                );
                ProbeOutcome::Unreachable
            }
        }
    }
}
