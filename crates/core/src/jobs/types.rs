//! Types for the job pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Job status as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
    /// Any status string the kiosk does not recognize.
    Unknown,
}

impl JobStatus {
    /// Parse a server status string, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "done" => JobStatus::Done,
            "error" => JobStatus::Error,
            _ => JobStatus::Unknown,
        }
    }
}

/// Body of a successful upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub position_in_queue: Option<u32>,
    #[serde(default)]
    pub estimated_wait_seconds: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of a status poll. `status` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::parse(&self.status)
    }
}

/// Errors from the job server client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobServerError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("failed to build request: {0}")]
    Request(String),
}

impl JobServerError {
    /// Whether this failure points at the kiosk's own network path.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, JobServerError::Timeout | JobServerError::Connection(_))
    }
}

/// The remote image-processing job server.
#[async_trait]
pub trait JobServer: Send + Sync {
    /// Upload a PNG for processing.
    async fn upload(&self, png: Vec<u8>, workflow: &str) -> Result<UploadResponse, JobServerError>;

    /// Fetch the status of a job.
    async fn status(&self, request_id: &str) -> Result<StatusResponse, JobServerError>;
}

/// Network reachability as seen from the kiosk.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// UI affordances around a submission (progress indicator, accept/reject).
pub trait ProcessUi: Send + Sync {
    /// Show progress and disable accept/reject.
    fn begin_processing(&self);

    /// Hide progress and re-enable accept/reject.
    fn reset_after_process(&self);
}

/// Per-submission tracking. Discarded when polling terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub request_id: String,
    pub status: Option<JobStatus>,
    pub consecutive_job_errors: u32,
    pub consecutive_bad_requests: u32,
}

impl JobRequest {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: None,
            consecutive_job_errors: 0,
            consecutive_bad_requests: 0,
        }
    }

    pub fn reset_counters(&mut self) {
        self.consecutive_job_errors = 0;
        self.consecutive_bad_requests = 0;
    }

    /// Count an `error` status. Returns true, and resets the counter, when
    /// `threshold` is reached.
    pub fn record_job_error(&mut self, threshold: u32) -> bool {
        self.consecutive_bad_requests = 0;
        self.consecutive_job_errors += 1;
        if self.consecutive_job_errors >= threshold {
            self.consecutive_job_errors = 0;
            return true;
        }
        false
    }

    /// Count a bad-request poll failure. Returns true, and resets the counter,
    /// when `threshold` is reached.
    pub fn record_bad_request(&mut self, threshold: u32) -> bool {
        self.consecutive_bad_requests += 1;
        if self.consecutive_bad_requests >= threshold {
            self.consecutive_bad_requests = 0;
            return true;
        }
        false
    }
}

/// Where a connectivity loss was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    Upload,
    Poll,
}

impl SubmissionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStage::Upload => "upload",
            SubmissionStage::Poll => "poll",
        }
    }
}

impl std::fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submission was escalated to maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum EscalationCause {
    JobErrors { count: u32 },
    StatusBadRequests { count: u32 },
}

impl std::fmt::Display for EscalationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationCause::JobErrors { count } => write!(f, "{} consecutive job errors", count),
            EscalationCause::StatusBadRequests { count } => {
                write!(f, "{} consecutive bad-request polls", count)
            }
        }
    }
}

/// Why a submission ended without a result or escalation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    #[error("no connectivity during {stage}")]
    NoConnectivity { stage: SubmissionStage },

    #[error("upload rejected: {0}")]
    UploadRejected(String),

    #[error("invalid upload response: {0}")]
    InvalidUploadResponse(String),

    #[error("status poll failed: {0}")]
    PollFailed(String),

    #[error("cancelled")]
    Cancelled,
}

/// Terminal state of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The job finished and the thank-you screen was requested.
    Done {
        request_id: String,
        image_url: String,
    },
    /// The server broke the status contract (malformed body or `done`
    /// without an image).
    Error { request_id: String, reason: String },
    /// A threshold was crossed and maintenance was requested.
    Escalated {
        request_id: String,
        cause: EscalationCause,
    },
    Aborted(AbortReason),
}

impl SubmissionOutcome {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Done { request_id, .. }
            | SubmissionOutcome::Error { request_id, .. }
            | SubmissionOutcome::Escalated { request_id, .. } => Some(request_id),
            SubmissionOutcome::Aborted(_) => None,
        }
    }
}

/// Errors returned by `JobPipeline::submit` itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("a submission is already in progress")]
    SubmissionInProgress,
}
