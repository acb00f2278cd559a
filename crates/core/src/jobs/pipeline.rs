//! Job submission pipeline: upload, poll, escalate.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::maintenance::MaintenanceTrigger;
use crate::screen::Navigator;
use crate::session::{KioskEvent, SessionLogHandle, SessionStore, RESULT_IMAGE_URL_KEY};

use super::config::PipelineConfig;
use super::types::{
    AbortReason, Connectivity, EscalationCause, JobRequest, JobServer, JobServerError, JobStatus,
    PipelineError, ProcessUi, SubmissionOutcome, SubmissionStage,
};

/// Releases the single-submission slot.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Restores UI affordances exactly once, whichever way the submission ends.
struct UiResetGuard<'a>(&'a dyn ProcessUi);

impl Drop for UiResetGuard<'_> {
    fn drop(&mut self) {
        self.0.reset_after_process();
    }
}

/// Drives one photo submission at a time from upload to a terminal state.
pub struct JobPipeline {
    config: PipelineConfig,
    server: Arc<dyn JobServer>,
    connectivity: Arc<dyn Connectivity>,
    navigator: Arc<dyn Navigator>,
    maintenance: Arc<dyn MaintenanceTrigger>,
    ui: Arc<dyn ProcessUi>,
    session_store: SessionStore,
    session_log: Option<SessionLogHandle>,
    capture_screen: String,
    processing_screen: Option<String>,
    thank_you_screen: String,

    busy: AtomicBool,
    cancel_tx: broadcast::Sender<()>,
}

impl JobPipeline {
    pub fn new(
        config: PipelineConfig,
        server: Arc<dyn JobServer>,
        connectivity: Arc<dyn Connectivity>,
        navigator: Arc<dyn Navigator>,
        maintenance: Arc<dyn MaintenanceTrigger>,
        ui: Arc<dyn ProcessUi>,
    ) -> Self {
        let (cancel_tx, _) = broadcast::channel(1);

        Self {
            config,
            server,
            connectivity,
            navigator,
            maintenance,
            ui,
            session_store: SessionStore::new(),
            session_log: None,
            capture_screen: "capture".to_string(),
            processing_screen: None,
            thank_you_screen: "thank-you".to_string(),
            busy: AtomicBool::new(false),
            cancel_tx,
        }
    }

    /// Screens used for the reject flow and for showing the result.
    pub fn with_screens(mut self, capture: impl Into<String>, thank_you: impl Into<String>) -> Self {
        self.capture_screen = capture.into();
        self.thank_you_screen = thank_you.into();
        self
    }

    /// Screen shown while an accepted job is queued or running.
    pub fn with_processing_screen(mut self, processing: impl Into<String>) -> Self {
        self.processing_screen = Some(processing.into());
        self
    }

    /// Share the store the screen controller clears on screen exit.
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session_store = store;
        self
    }

    pub fn with_session_log(mut self, handle: SessionLogHandle) -> Self {
        self.session_log = Some(handle);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Interrupt the running submission at its next suspension point.
    pub fn cancel(&self) {
        if self.is_busy() {
            info!("Cancelling submission");
            let _ = self.cancel_tx.send(());
        }
    }

    /// Operator rejected the photo: go back to capture for a retake.
    pub async fn reject(&self) {
        if self.is_busy() {
            warn!("Reject ignored while a submission is running");
            return;
        }
        if let Err(e) = self.navigator.open_screen(&self.capture_screen).await {
            if e.is_benign() {
                debug!("Reject navigation skipped: {}", e);
            } else {
                warn!("Failed to return to capture screen: {}", e);
            }
        }
    }

    /// Submit a PNG and drive the job to a terminal state.
    ///
    /// Only one submission runs at a time. UI affordances are restored once
    /// on every path out of this function.
    pub async fn submit(&self, png: Vec<u8>) -> Result<SubmissionOutcome, PipelineError> {
        // Subscribe first: any cancel sent once `is_busy()` is true must land.
        let mut cancel_rx = self.cancel_tx.subscribe();
        if self.busy.swap(true, Ordering::AcqRel) {
            warn!("Submission already in progress, ignoring request");
            return Err(PipelineError::SubmissionInProgress);
        }
        let _busy = BusyGuard(&self.busy);

        self.ui.begin_processing();
        let _reset = UiResetGuard(self.ui.as_ref());

        let outcome = self.run(png, &mut cancel_rx).await;
        self.log_outcome(&outcome).await;
        Ok(outcome)
    }

    async fn run(
        &self,
        png: Vec<u8>,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> SubmissionOutcome {
        // Upload
        match cancellable(cancel_rx, self.connectivity.is_online()).await {
            None => return SubmissionOutcome::Aborted(AbortReason::Cancelled),
            Some(false) => {
                return self.no_connectivity(SubmissionStage::Upload).await;
            }
            Some(true) => {}
        }

        let uploaded = match cancellable(cancel_rx, self.server.upload(png, &self.config.workflow)).await {
            None => return SubmissionOutcome::Aborted(AbortReason::Cancelled),
            Some(result) => result,
        };
        let response = match uploaded {
            Ok(response) => response,
            Err(e) if e.is_connectivity() => {
                warn!("Upload failed: {}", e);
                return self.no_connectivity(SubmissionStage::Upload).await;
            }
            Err(JobServerError::InvalidResponse(msg)) => {
                return SubmissionOutcome::Aborted(AbortReason::InvalidUploadResponse(msg));
            }
            Err(e) => return SubmissionOutcome::Aborted(AbortReason::UploadRejected(e.to_string())),
        };

        let request_id = match response.request_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let detail = response
                    .error
                    .clone()
                    .unwrap_or_else(|| "missing request_id".to_string());
                return SubmissionOutcome::Aborted(AbortReason::InvalidUploadResponse(detail));
            }
        };

        info!(
            request_id = %request_id,
            position = ?response.position_in_queue,
            wait_secs = ?response.estimated_wait_seconds,
            "Upload accepted"
        );
        self.emit(KioskEvent::UploadAccepted {
            request_id: request_id.clone(),
            position_in_queue: response.position_in_queue,
            estimated_wait_seconds: response.estimated_wait_seconds,
        })
        .await;

        if let Some(screen) = &self.processing_screen {
            if let Err(e) = self.navigator.open_screen(screen).await {
                debug!(screen = %screen, "Processing screen not opened: {}", e);
            }
        }

        self.poll(JobRequest::new(request_id), cancel_rx).await
    }

    async fn poll(
        &self,
        mut job: JobRequest,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> SubmissionOutcome {
        loop {
            if cancellable(cancel_rx, tokio::time::sleep(self.config.poll_interval()))
                .await
                .is_none()
            {
                return SubmissionOutcome::Aborted(AbortReason::Cancelled);
            }

            match cancellable(cancel_rx, self.connectivity.is_online()).await {
                None => return SubmissionOutcome::Aborted(AbortReason::Cancelled),
                Some(false) => return self.no_connectivity(SubmissionStage::Poll).await,
                Some(true) => {}
            }

            let polled = match cancellable(cancel_rx, self.server.status(&job.request_id)).await {
                None => return SubmissionOutcome::Aborted(AbortReason::Cancelled),
                Some(result) => result,
            };

            let response = match polled {
                Ok(response) => response,
                Err(JobServerError::Http { status, .. }) if status == self.config.bad_request_status => {
                    let threshold = self.config.status_bad_request_threshold;
                    warn!(
                        request_id = %job.request_id,
                        status,
                        count = job.consecutive_bad_requests + 1,
                        threshold,
                        "Status poll rejected"
                    );
                    if job.record_bad_request(threshold) {
                        return self
                            .escalate(job, EscalationCause::StatusBadRequests { count: threshold })
                            .await;
                    }
                    continue;
                }
                Err(e) if e.is_connectivity() => {
                    warn!(request_id = %job.request_id, "Status poll failed: {}", e);
                    return self.no_connectivity(SubmissionStage::Poll).await;
                }
                Err(JobServerError::InvalidResponse(msg)) => {
                    return SubmissionOutcome::Error {
                        request_id: job.request_id,
                        reason: msg,
                    };
                }
                Err(e) => {
                    return SubmissionOutcome::Aborted(AbortReason::PollFailed(e.to_string()));
                }
            };

            let status = response.job_status();
            job.status = Some(status);
            match status {
                JobStatus::Queued | JobStatus::Processing => {
                    debug!(request_id = %job.request_id, status = ?status, "Job pending");
                    job.reset_counters();
                }
                JobStatus::Done => {
                    job.reset_counters();
                    let Some(image_url) = response.image_url.filter(|url| !url.trim().is_empty())
                    else {
                        return SubmissionOutcome::Error {
                            request_id: job.request_id,
                            reason: "done without image_url".to_string(),
                        };
                    };
                    return self.complete(job, image_url).await;
                }
                JobStatus::Error => {
                    let threshold = self.config.job_error_threshold;
                    warn!(
                        request_id = %job.request_id,
                        error = ?response.error,
                        count = job.consecutive_job_errors + 1,
                        threshold,
                        "Job reported an error"
                    );
                    if job.record_job_error(threshold) {
                        return self
                            .escalate(job, EscalationCause::JobErrors { count: threshold })
                            .await;
                    }
                }
                JobStatus::Unknown => {
                    warn!(
                        request_id = %job.request_id,
                        status = %response.status,
                        "Unknown job status, continuing to poll"
                    );
                }
            }
        }
    }

    async fn complete(&self, job: JobRequest, image_url: String) -> SubmissionOutcome {
        self.session_store
            .set(&self.thank_you_screen, RESULT_IMAGE_URL_KEY, image_url.clone());

        if let Err(e) = self.navigator.open_screen(&self.thank_you_screen).await {
            warn!(screen = %self.thank_you_screen, "Could not open result screen: {}", e);
        }

        SubmissionOutcome::Done {
            request_id: job.request_id,
            image_url,
        }
    }

    async fn escalate(&self, job: JobRequest, cause: EscalationCause) -> SubmissionOutcome {
        error!(request_id = %job.request_id, "Escalating to maintenance: {}", cause);
        self.maintenance.activate_maintenance().await;

        SubmissionOutcome::Escalated {
            request_id: job.request_id,
            cause,
        }
    }

    async fn no_connectivity(&self, stage: SubmissionStage) -> SubmissionOutcome {
        warn!(stage = stage.as_str(), "No internet connection");
        self.emit(KioskEvent::NoConnectivity {
            stage: stage.as_str().to_string(),
        })
        .await;
        SubmissionOutcome::Aborted(AbortReason::NoConnectivity { stage })
    }

    async fn log_outcome(&self, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Done {
                request_id,
                image_url,
            } => {
                info!(request_id = %request_id, image_url = %image_url, "Job completed");
                self.emit(KioskEvent::JobCompleted {
                    request_id: request_id.clone(),
                    image_url: image_url.clone(),
                })
                .await;
            }
            SubmissionOutcome::Escalated { request_id, cause } => {
                self.emit(KioskEvent::JobEscalated {
                    request_id: request_id.clone(),
                    cause: cause.to_string(),
                })
                .await;
            }
            SubmissionOutcome::Error { request_id, reason } => {
                error!(request_id = %request_id, "Job status contract violated: {}", reason);
                self.emit(KioskEvent::JobAborted {
                    reason: reason.clone(),
                })
                .await;
            }
            // Already reported
            SubmissionOutcome::Aborted(AbortReason::NoConnectivity { .. }) => {}
            SubmissionOutcome::Aborted(reason) => {
                warn!("Submission aborted: {}", reason);
                self.emit(KioskEvent::JobAborted {
                    reason: reason.to_string(),
                })
                .await;
            }
        }
    }

    async fn emit(&self, event: KioskEvent) {
        if let Some(ref log) = self.session_log {
            log.emit(event).await;
        }
    }
}

/// Run `fut` unless a cancel signal arrives first.
async fn cancellable<F: Future>(cancel_rx: &mut broadcast::Receiver<()>, fut: F) -> Option<F::Output> {
    tokio::select! {
        _ = cancel_rx.recv() => None,
        output = fut => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::jobs::{StatusResponse, UploadResponse};
    use crate::testing::{
        MockConnectivity, MockJobServer, MockMaintenanceTrigger, MockNavigator, MockProcessUi,
        NavigatorCall,
    };

    struct Harness {
        server: Arc<MockJobServer>,
        connectivity: Arc<MockConnectivity>,
        navigator: Arc<MockNavigator>,
        trigger: Arc<MockMaintenanceTrigger>,
        ui: Arc<MockProcessUi>,
        store: SessionStore,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                server: Arc::new(MockJobServer::new()),
                connectivity: Arc::new(MockConnectivity::new()),
                navigator: Arc::new(MockNavigator::new(
                    &["cta", "capture", "validation", "processing", "thank-you"],
                    "validation",
                )),
                trigger: Arc::new(MockMaintenanceTrigger::new()),
                ui: Arc::new(MockProcessUi::new()),
                store: SessionStore::new(),
            }
        }

        fn pipeline(&self, config: PipelineConfig) -> JobPipeline {
            JobPipeline::new(
                config,
                self.server.clone(),
                self.connectivity.clone(),
                self.navigator.clone(),
                self.trigger.clone(),
                self.ui.clone(),
            )
            .with_session_store(self.store.clone())
        }
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            poll_interval_secs: 0.001,
            job_error_threshold: 2,
            status_bad_request_threshold: 2,
            ..Default::default()
        }
    }

    fn status(value: &str) -> Result<StatusResponse, JobServerError> {
        Ok(StatusResponse {
            status: value.to_string(),
            image_url: None,
            error: None,
        })
    }

    fn done(url: &str) -> Result<StatusResponse, JobServerError> {
        Ok(StatusResponse {
            status: "done".to_string(),
            image_url: Some(url.to_string()),
            error: None,
        })
    }

    fn bad_request() -> Result<StatusResponse, JobServerError> {
        Err(JobServerError::Http {
            status: 400,
            body: String::new(),
        })
    }

    #[tokio::test]
    async fn test_done_opens_thank_you_once_and_resets_ui() {
        let h = Harness::new();
        h.server.push_statuses(vec![status("queued"), status("processing"), done("http://r/1.png")]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1, 2, 3]).await.unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Done {
                request_id: "req-1".to_string(),
                image_url: "http://r/1.png".to_string()
            }
        );
        assert_eq!(h.navigator.open_count("thank-you"), 1);
        assert_eq!(h.ui.begin_count(), 1);
        assert_eq!(h.ui.reset_count(), 1);
        assert_eq!(
            h.store.get("thank-you", RESULT_IMAGE_URL_KEY).as_deref(),
            Some("http://r/1.png")
        );
        assert_eq!(h.trigger.activation_count(), 0);
        assert!(!pipeline.is_busy());
    }

    #[tokio::test]
    async fn test_upload_sends_workflow() {
        let h = Harness::new();
        h.server.push_statuses(vec![done("http://r/1.png")]);
        let pipeline = h.pipeline(PipelineConfig {
            workflow: "portrait".to_string(),
            ..fast_config()
        });

        pipeline.submit(vec![9; 16]).await.unwrap();

        let uploads = h.server.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].workflow, "portrait");
        assert_eq!(uploads[0].bytes, 16);
    }

    #[tokio::test]
    async fn test_job_errors_escalate_once_at_threshold() {
        let h = Harness::new();
        h.server.push_statuses(vec![status("error"), status("error")]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Escalated {
                cause: EscalationCause::JobErrors { count: 2 },
                ..
            }
        ));
        assert_eq!(h.trigger.activation_count(), 1);
        assert_eq!(h.ui.reset_count(), 1);
        assert_eq!(h.server.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_pending_status_resets_job_error_streak() {
        let h = Harness::new();
        h.server.push_statuses(vec![
            status("error"),
            status("processing"),
            status("error"),
            done("http://r/2.png"),
        ]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Done { .. }));
        assert_eq!(h.trigger.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_requests_escalate_and_stop_polling() {
        let h = Harness::new();
        h.server
            .push_statuses(vec![bad_request(), bad_request(), status("processing")]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Escalated {
                cause: EscalationCause::StatusBadRequests { count: 2 },
                ..
            }
        ));
        assert_eq!(h.trigger.activation_count(), 1);
        assert_eq!(h.server.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_successful_poll_resets_bad_request_streak() {
        let h = Harness::new();
        h.server.push_statuses(vec![
            bad_request(),
            status("queued"),
            bad_request(),
            done("http://r/3.png"),
        ]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Done { .. }));
        assert_eq!(h.trigger.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_status_keeps_polling() {
        let h = Harness::new();
        h.server.push_statuses(vec![
            status("error"),
            status("paused"),
            status("error"),
        ]);
        let pipeline = h.pipeline(fast_config());

        // Unknown leaves the error streak intact, so the second error fires
        let outcome = pipeline.submit(vec![1]).await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Escalated { .. }));
        assert_eq!(h.server.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_offline_before_upload_aborts_without_escalation() {
        let h = Harness::new();
        h.connectivity.set_online(false);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Aborted(AbortReason::NoConnectivity {
                stage: SubmissionStage::Upload
            })
        );
        assert!(h.server.uploads().is_empty());
        assert_eq!(h.trigger.activation_count(), 0);
        assert_eq!(h.ui.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_transport_failure_is_no_connectivity() {
        let h = Harness::new();
        h.server.set_upload_result(Err(JobServerError::Timeout));
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Aborted(AbortReason::NoConnectivity {
                stage: SubmissionStage::Upload
            })
        );
        assert_eq!(h.trigger.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_request_id_aborts() {
        let h = Harness::new();
        h.server.set_upload_result(Ok(UploadResponse {
            status: Some("ok".to_string()),
            ..Default::default()
        }));
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Aborted(AbortReason::InvalidUploadResponse(_))
        ));
        assert_eq!(h.server.status_calls(), 0);
        assert_eq!(h.ui.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_poll_connection_loss_aborts() {
        let h = Harness::new();
        h.server.push_statuses(vec![
            status("queued"),
            Err(JobServerError::Connection("reset".to_string())),
        ]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Aborted(AbortReason::NoConnectivity {
                stage: SubmissionStage::Poll
            })
        );
        assert_eq!(h.trigger.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_other_http_failure_aborts_without_escalation() {
        let h = Harness::new();
        h.server.push_statuses(vec![Err(JobServerError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        })]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Aborted(AbortReason::PollFailed(_))
        ));
        assert_eq!(h.trigger.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_done_without_image_is_error() {
        let h = Harness::new();
        h.server.push_statuses(vec![status("done")]);
        let pipeline = h.pipeline(fast_config());

        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Error { .. }));
        assert_eq!(h.navigator.open_count("thank-you"), 0);
        assert_eq!(h.ui.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected_while_running() {
        let h = Harness::new();
        let pipeline = Arc::new(h.pipeline(PipelineConfig {
            poll_interval_secs: 0.05,
            ..fast_config()
        }));
        // Script runs out of statuses and the mock keeps answering "processing"

        let first = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.submit(vec![1]).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            pipeline.submit(vec![2]).await,
            Err(PipelineError::SubmissionInProgress)
        );

        pipeline.cancel();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, SubmissionOutcome::Aborted(AbortReason::Cancelled));
        assert_eq!(h.ui.begin_count(), 1);
        assert_eq!(h.ui.reset_count(), 1);
        assert!(!pipeline.is_busy());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_right_after_busy_is_not_lost() {
        let h = Harness::new();
        h.server.set_latency(Duration::from_millis(200));
        let pipeline = Arc::new(h.pipeline(fast_config()));

        let running = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.submit(vec![1]).await })
        };
        while !pipeline.is_busy() {
            tokio::task::yield_now().await;
        }
        pipeline.cancel();

        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, SubmissionOutcome::Aborted(AbortReason::Cancelled));
        assert!(h.server.polled_ids().is_empty());
        assert_eq!(h.ui.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_processing_screen_shown_after_upload() {
        let h = Harness::new();
        h.server.push_statuses(vec![status("processing"), done("http://r/5.png")]);
        let pipeline = h.pipeline(fast_config()).with_processing_screen("processing");

        pipeline.submit(vec![1]).await.unwrap();

        assert_eq!(
            h.navigator.calls(),
            vec![
                NavigatorCall::Open("processing".to_string()),
                NavigatorCall::Open("thank-you".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_processing_screen_skipped_when_upload_fails() {
        let h = Harness::new();
        h.connectivity.set_online(false);
        let pipeline = h.pipeline(fast_config()).with_processing_screen("processing");

        pipeline.submit(vec![1]).await.unwrap();

        assert_eq!(h.navigator.open_count("processing"), 0);
    }

    #[tokio::test]
    async fn test_counters_do_not_carry_across_submissions() {
        let h = Harness::new();
        h.server
            .push_statuses(vec![status("error"), Err(JobServerError::Http {
                status: 500,
                body: String::new(),
            })]);
        let pipeline = h.pipeline(fast_config());
        pipeline.submit(vec![1]).await.unwrap();

        h.server.push_statuses(vec![status("error"), done("http://r/4.png")]);
        let outcome = pipeline.submit(vec![1]).await.unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Done { .. }));
        assert_eq!(h.trigger.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_reject_returns_to_capture() {
        let h = Harness::new();
        let pipeline = h.pipeline(fast_config());

        pipeline.reject().await;

        assert_eq!(h.navigator.current_screen().as_deref(), Some("capture"));
    }
}
