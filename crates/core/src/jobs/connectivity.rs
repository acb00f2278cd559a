//! Pre-flight network check.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::config::PipelineConfig;
use super::types::{Connectivity, JobServerError};

/// Treats any HTTP response from a well-known endpoint as "online".
pub struct HttpConnectivity {
    client: Client,
    url: String,
}

impl HttpConnectivity {
    pub fn new(config: &PipelineConfig) -> Result<Self, JobServerError> {
        let client = Client::builder()
            .timeout(config.connectivity_timeout())
            .build()
            .map_err(|e| JobServerError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: config.connectivity_url.clone(),
        })
    }
}

#[async_trait]
impl Connectivity for HttpConnectivity {
    async fn is_online(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.url, "Connectivity check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_port_is_offline() {
        let config = PipelineConfig {
            connectivity_url: "http://127.0.0.1:9".to_string(),
            connectivity_timeout_secs: 1,
            ..Default::default()
        };
        let connectivity = HttpConnectivity::new(&config).unwrap();
        assert!(!connectivity.is_online().await);
    }
}
