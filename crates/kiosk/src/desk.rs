//! Photo validation desk.
//!
//! Holds the captured photo while the visitor decides, then hands it to the
//! job pipeline on accept or sends the kiosk back to capture on reject.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use totem_core::{JobPipeline, Navigator, PipelineError, SubmissionOutcome};

pub type SubmissionTask = JoinHandle<Result<SubmissionOutcome, PipelineError>>;

pub struct PhotoDesk {
    pipeline: Arc<JobPipeline>,
    navigator: Arc<dyn Navigator>,
    validation_screen: String,
    pending: Mutex<Option<Vec<u8>>>,
}

impl PhotoDesk {
    pub fn new(
        pipeline: Arc<JobPipeline>,
        navigator: Arc<dyn Navigator>,
        validation_screen: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            navigator,
            validation_screen: validation_screen.into(),
            pending: Mutex::new(None),
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Keep `png` for validation and show the validation screen. Refused
    /// while a submission is running.
    pub async fn present(&self, png: Vec<u8>) -> bool {
        if self.pipeline.is_busy() {
            warn!("Photo ignored while a submission is running");
            return false;
        }
        info!(bytes = png.len(), "Photo captured, awaiting validation");
        *self.pending() = Some(png);

        if let Err(e) = self.navigator.open_screen(&self.validation_screen).await {
            debug!(screen = %self.validation_screen, "Validation screen not opened: {}", e);
        }
        true
    }

    /// Submit the pending photo in the background.
    pub fn accept(&self) -> Option<SubmissionTask> {
        let Some(png) = self.pending().take() else {
            warn!("Accept ignored, no photo pending");
            return None;
        };

        let pipeline = Arc::clone(&self.pipeline);
        Some(tokio::spawn(async move {
            let result = pipeline.submit(png).await;
            match &result {
                Ok(outcome) => info!(?outcome, "Submission finished"),
                Err(e) => warn!("Submission not started: {}", e),
            }
            result
        }))
    }

    /// Discard the pending photo and return to capture.
    pub async fn reject(&self) {
        if self.pending().take().is_some() {
            info!("Photo rejected");
        }
        self.pipeline.reject().await;
    }

    pub fn cancel(&self) {
        self.pipeline.cancel();
    }
}

#[cfg(test)]
mod tests {
    use totem_core::{
        maintenance::{MaintenanceMonitor, MaintenanceTrigger, MonitorConfig},
        session::{SessionStore, RESULT_IMAGE_URL_KEY},
        testing::{fixtures, MockConnectivity, MockHealthProbe, MockJobServer, MockProcessUi},
        PipelineConfig, ScreenController,
    };

    use super::*;

    struct TestHarness {
        controller: Arc<ScreenController>,
        monitor: Arc<MaintenanceMonitor>,
        server: Arc<MockJobServer>,
        store: SessionStore,
        desk: PhotoDesk,
    }

    impl TestHarness {
        async fn new() -> Self {
            let store = SessionStore::new();
            let (registry, _mocks) = fixtures::mock_registry(fixtures::KIOSK_SCREENS);
            let controller = Arc::new(
                ScreenController::new(registry, "cta")
                    .unwrap()
                    .with_session_store(store.clone()),
            );
            controller.initialize().await;
            let navigator = Arc::clone(&controller) as Arc<dyn Navigator>;

            let monitor = Arc::new(MaintenanceMonitor::new(
                MonitorConfig::default(),
                Arc::new(MockHealthProbe::new()),
                Arc::clone(&navigator),
                "cta",
                "maintenance",
            ));
            let server = Arc::new(MockJobServer::new());
            let pipeline = JobPipeline::new(
                PipelineConfig {
                    poll_interval_secs: 0.001,
                    job_error_threshold: 2,
                    ..Default::default()
                },
                Arc::clone(&server) as _,
                Arc::new(MockConnectivity::new()),
                Arc::clone(&navigator),
                Arc::clone(&monitor) as Arc<dyn MaintenanceTrigger>,
                Arc::new(MockProcessUi::new()),
            )
            .with_screens("capture", "thank-you")
            .with_processing_screen("processing")
            .with_session_store(store.clone());

            let desk = PhotoDesk::new(Arc::new(pipeline), navigator, "validation");

            Self {
                controller,
                monitor,
                server,
                store,
                desk,
            }
        }
    }

    #[tokio::test]
    async fn test_accept_runs_job_to_thank_you() {
        let h = TestHarness::new().await;
        h.controller.open_screen("capture").await.unwrap();
        h.server.push_statuses(vec![fixtures::done("http://r/desk.png")]);

        assert!(h.desk.present(vec![7; 32]).await);
        assert_eq!(h.controller.current_screen().as_deref(), Some("validation"));

        let outcome = h.desk.accept().unwrap().await.unwrap().unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Done { .. }));
        assert_eq!(h.controller.current_screen().as_deref(), Some("thank-you"));
        assert_eq!(
            h.store.get("thank-you", RESULT_IMAGE_URL_KEY).as_deref(),
            Some("http://r/desk.png")
        );
        assert_eq!(h.server.uploads()[0].bytes, 32);
        assert!(!h.desk.has_pending());
    }

    #[tokio::test]
    async fn test_reject_discards_photo() {
        let h = TestHarness::new().await;
        h.desk.present(vec![1]).await;

        h.desk.reject().await;

        assert_eq!(h.controller.current_screen().as_deref(), Some("capture"));
        assert!(h.desk.accept().is_none());
        assert!(h.server.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_job_errors_escalate_to_live_monitor() {
        let h = TestHarness::new().await;
        h.server
            .push_statuses(vec![fixtures::status("error"), fixtures::status("error")]);

        h.desk.present(vec![1]).await;
        let outcome = h.desk.accept().unwrap().await.unwrap().unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Escalated { .. }));
        assert!(h.monitor.is_active().await);
        assert_eq!(
            h.controller.current_screen().as_deref(),
            Some("maintenance")
        );
    }
}
