//! Headless rendering layer.
//!
//! The kiosk core only needs something that implements [`Screen`]; this one
//! tracks visibility and logs, with an optional fixed animation time so the
//! transition gate behaves like it does on the real display.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use totem_core::{ProcessUi, Screen, ScreenRegistry};

pub struct HeadlessScreen {
    name: String,
    animation: Duration,
    visible: AtomicBool,
}

impl HeadlessScreen {
    pub fn new(name: impl Into<String>, animation: Duration) -> Self {
        Self {
            name: name.into(),
            animation,
            visible: AtomicBool::new(false),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Screen for HeadlessScreen {
    async fn activate(&self) {
        self.visible.store(true, Ordering::Release);
        if !self.animation.is_zero() {
            tokio::time::sleep(self.animation).await;
        }
        debug!(screen = %self.name, "Enter animation finished");
    }

    async fn deactivate(&self) {
        if !self.animation.is_zero() {
            tokio::time::sleep(self.animation).await;
        }
        self.visible.store(false, Ordering::Release);
        debug!(screen = %self.name, "Exit animation finished");
    }

    fn show(&self) {
        self.visible.store(true, Ordering::Release);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::Release);
    }
}

/// Build a registry with one headless screen per name.
pub fn headless_registry(names: &[String], animation: Duration) -> ScreenRegistry {
    let mut registry = ScreenRegistry::new();
    for name in names {
        registry.insert(
            name.clone(),
            Arc::new(HeadlessScreen::new(name.clone(), animation)) as Arc<dyn Screen>,
        );
    }
    registry
}

/// Stands in for the progress indicator and the accept/reject buttons.
pub struct LoggingProcessUi;

impl ProcessUi for LoggingProcessUi {
    fn begin_processing(&self) {
        info!("Processing started, accept/reject disabled");
    }

    fn reset_after_process(&self) {
        info!("Processing finished, accept/reject enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_follows_transitions() {
        let screen = HeadlessScreen::new("cta", Duration::from_millis(5));
        assert!(!screen.is_visible());

        tokio_test::block_on(screen.activate());
        assert!(screen.is_visible());
        tokio_test::block_on(screen.deactivate());
        assert!(!screen.is_visible());

        screen.show();
        assert!(screen.is_visible());
        screen.hide();
        assert!(!screen.is_visible());
    }

    #[test]
    fn test_registry_has_every_name() {
        let names = vec!["cta".to_string(), "capture".to_string()];
        let registry = headless_registry(&names, Duration::ZERO);
        assert_eq!(registry.names(), names);
    }
}
