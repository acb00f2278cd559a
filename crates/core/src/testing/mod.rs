//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait,
//! so the screen controller, maintenance monitor, job pipeline and control
//! loop can be exercised without a display, a network or a job server.
//!
//! # Example
//!
//! ```rust,ignore
//! use totem_core::testing::{MockNavigator, MockHealthProbe};
//!
//! let navigator = Arc::new(MockNavigator::new(&["cta", "maintenance"], "cta"));
//! let probe = Arc::new(MockHealthProbe::scripted([ProbeOutcome::Unreachable]));
//!
//! // Use with MaintenanceMonitor::new(...)
//! ```

mod mock_job_server;
mod mock_probe;
mod mock_screen;
mod recording_sink;

pub use mock_job_server::{MockConnectivity, MockJobServer, MockProcessUi, RecordedUpload};
pub use mock_probe::{MockHealthProbe, MockMaintenanceTrigger};
pub use mock_screen::{MockNavigator, MockScreen, NavigatorCall};
pub use recording_sink::RecordingSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use crate::jobs::{JobServerError, StatusResponse};
    use crate::screen::{Screen, ScreenRegistry};

    use super::MockScreen;

    /// Screen names of the standard kiosk flow.
    pub const KIOSK_SCREENS: &[&str] = &[
        "cta",
        "instructions",
        "capture",
        "validation",
        "processing",
        "thank-you",
        "maintenance",
        "closed",
    ];

    /// Registry of instant mock screens, returned alongside the mocks.
    pub fn mock_registry(names: &[&str]) -> (ScreenRegistry, Vec<Arc<MockScreen>>) {
        let mut registry = ScreenRegistry::new();
        let mut mocks = Vec::with_capacity(names.len());
        for name in names {
            let screen = Arc::new(MockScreen::new());
            registry.insert(*name, Arc::clone(&screen) as Arc<dyn Screen>);
            mocks.push(screen);
        }
        (registry, mocks)
    }

    /// A status poll response with the given status string.
    pub fn status(value: &str) -> Result<StatusResponse, JobServerError> {
        Ok(StatusResponse {
            status: value.to_string(),
            image_url: None,
            error: None,
        })
    }

    /// A `done` response carrying `image_url`.
    pub fn done(image_url: &str) -> Result<StatusResponse, JobServerError> {
        Ok(StatusResponse {
            status: "done".to_string(),
            image_url: Some(image_url.to_string()),
            error: None,
        })
    }

    /// A failed poll with the given HTTP status.
    pub fn http_error(status: u16) -> Result<StatusResponse, JobServerError> {
        Err(JobServerError::Http {
            status,
            body: String::new(),
        })
    }
}
