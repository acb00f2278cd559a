//! Mock job server and submission collaborators for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::jobs::{
    Connectivity, JobServer, JobServerError, ProcessUi, StatusResponse, UploadResponse,
};

/// A recorded upload for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Size of the uploaded image in bytes.
    pub bytes: usize,
    pub workflow: String,
}

/// Mock implementation of the JobServer trait.
///
/// Provides controllable behavior for testing:
/// - Scripted upload result (defaults to request id `req-1`)
/// - Scripted status responses, returned in order
/// - `processing` once the status script is exhausted
/// - Optional per-request latency
///
/// # Example
///
/// ```rust,ignore
/// use totem_core::testing::MockJobServer;
///
/// let server = MockJobServer::new();
/// server.push_statuses(vec![Ok(StatusResponse { status: "done".into(), .. })]);
/// ```
#[derive(Debug, Clone)]
pub struct MockJobServer {
    upload_result: Arc<RwLock<Result<UploadResponse, JobServerError>>>,
    statuses: Arc<RwLock<VecDeque<Result<StatusResponse, JobServerError>>>>,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    polled_ids: Arc<RwLock<Vec<String>>>,
    latency: Arc<RwLock<Duration>>,
}

impl Default for MockJobServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockJobServer {
    pub fn new() -> Self {
        Self {
            upload_result: Arc::new(RwLock::new(Ok(UploadResponse {
                status: Some("queued".to_string()),
                request_id: Some("req-1".to_string()),
                position_in_queue: Some(1),
                estimated_wait_seconds: Some(5.0),
                error: None,
            }))),
            statuses: Arc::new(RwLock::new(VecDeque::new())),
            uploads: Arc::new(RwLock::new(Vec::new())),
            polled_ids: Arc::new(RwLock::new(Vec::new())),
            latency: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Set the result returned by every upload.
    pub fn set_upload_result(&self, result: Result<UploadResponse, JobServerError>) {
        *self
            .upload_result
            .write()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    /// Append status responses to the script.
    pub fn push_statuses(&self, statuses: Vec<Result<StatusResponse, JobServerError>>) {
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(statuses);
    }

    /// Delay every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Get all recorded uploads.
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Request ids passed to status polls, in order.
    pub fn polled_ids(&self) -> Vec<String> {
        self.polled_ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status_calls(&self) -> usize {
        self.polled_ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.read().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl JobServer for MockJobServer {
    async fn upload(&self, png: Vec<u8>, workflow: &str) -> Result<UploadResponse, JobServerError> {
        self.simulate_latency().await;
        self.uploads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedUpload {
                bytes: png.len(),
                workflow: workflow.to_string(),
            });
        self.upload_result
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn status(&self, request_id: &str) -> Result<StatusResponse, JobServerError> {
        self.simulate_latency().await;
        self.polled_ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request_id.to_string());

        let next = self
            .statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| {
            Ok(StatusResponse {
                status: "processing".to_string(),
                image_url: None,
                error: None,
            })
        })
    }
}

/// Mock implementation of the Connectivity trait. Online by default.
#[derive(Debug, Clone)]
pub struct MockConnectivity {
    online: Arc<AtomicBool>,
    checks: Arc<AtomicUsize>,
}

impl Default for MockConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnectivity {
    pub fn new() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
            checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connectivity for MockConnectivity {
    async fn is_online(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}

/// Mock implementation of the ProcessUi trait. Counts calls.
#[derive(Debug, Clone, Default)]
pub struct MockProcessUi {
    begins: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl MockProcessUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_count(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ProcessUi for MockProcessUi {
    fn begin_processing(&self) {
        self.begins.fetch_add(1, Ordering::SeqCst);
    }

    fn reset_after_process(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}
