//! HTTP job server client.

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::config::PipelineConfig;
use super::types::{JobServer, JobServerError, StatusResponse, UploadResponse};

/// Job server reached over HTTP.
///
/// Uploads go to `POST {base}/api/upload` as multipart, status polls to
/// `GET {base}/api/result?request_id=<id>`.
pub struct HttpJobServer {
    client: Client,
    base_url: String,
}

impl HttpJobServer {
    pub fn new(base_url: impl Into<String>, config: &PipelineConfig) -> Result<Self, JobServerError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| JobServerError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn upload_url(&self) -> String {
        format!("{}/api/upload", self.base_url())
    }

    fn status_url(&self, request_id: &str) -> String {
        format!(
            "{}/api/result?request_id={}",
            self.base_url(),
            urlencoding::encode(request_id)
        )
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, JobServerError> {
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(JobServerError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| JobServerError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

fn map_transport_error(e: reqwest::Error) -> JobServerError {
    if e.is_timeout() {
        JobServerError::Timeout
    } else if e.is_connect() {
        JobServerError::Connection(e.to_string())
    } else if e.is_builder() {
        JobServerError::Request(e.to_string())
    } else {
        JobServerError::InvalidResponse(e.to_string())
    }
}

#[async_trait]
impl JobServer for HttpJobServer {
    async fn upload(&self, png: Vec<u8>, workflow: &str) -> Result<UploadResponse, JobServerError> {
        let url = self.upload_url();
        debug!(url = %url, bytes = png.len(), workflow, "Uploading image");

        let image = multipart::Part::bytes(png)
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| JobServerError::Request(e.to_string()))?;
        let form = multipart::Form::new()
            .part("image", image)
            .text("workflow", workflow.to_string());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        Self::read_json(response).await
    }

    async fn status(&self, request_id: &str) -> Result<StatusResponse, JobServerError> {
        let url = self.status_url(request_id);
        debug!(url = %url, "Polling job status");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        Self::read_json(response).await
    }
}
