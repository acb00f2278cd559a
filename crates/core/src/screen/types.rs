//! Types for screen orchestration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned when a screen change is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenError {
    /// Another transition has not finished yet.
    #[error("a screen transition is already in progress")]
    AlreadyTransitioning,

    /// No screen is registered under this name.
    #[error("unknown screen: {0}")]
    UnknownScreen(String),

    /// The target is already the visible screen.
    #[error("screen already active: {0}")]
    AlreadyActive(String),
}

impl ScreenError {
    /// Expected outcomes under rapid double-triggering; callers treat these
    /// as no-ops rather than failures.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            ScreenError::AlreadyTransitioning | ScreenError::AlreadyActive(_)
        )
    }
}

/// A visual container implemented by the rendering layer.
#[async_trait]
pub trait Screen: Send + Sync {
    /// Make the screen visible, running its enter animation to completion.
    async fn activate(&self);

    /// Hide the screen, running its exit animation to completion.
    async fn deactivate(&self);

    /// Make the screen visible immediately.
    fn show(&self);

    /// Hide the screen immediately.
    fn hide(&self);
}

/// Screen navigation as seen by the rest of the kiosk.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Animated, serialized transition to `name`.
    async fn open_screen(&self, name: &str) -> Result<(), ScreenError>;

    /// Immediate switch to `name`, bypassing animations and the transition gate.
    fn open_screen_instant(&self, name: &str) -> Result<(), ScreenError>;

    /// Hide every screen immediately.
    fn disable_all(&self);

    /// Name of the visible screen, if any.
    fn current_screen(&self) -> Option<String>;

    /// Whether `name` is a registered screen.
    fn is_registered(&self, name: &str) -> bool;
}

/// Closed registry of named screens.
#[derive(Clone, Default)]
pub struct ScreenRegistry {
    screens: HashMap<String, Arc<dyn Screen>>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a screen, replacing any previous one with the same name.
    pub fn with_screen(mut self, name: impl Into<String>, screen: Arc<dyn Screen>) -> Self {
        self.insert(name, screen);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, screen: Arc<dyn Screen>) {
        self.screens.insert(name.into(), screen);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Screen>> {
        self.screens.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.screens.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.screens.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Screen>)> {
        self.screens.iter()
    }
}

impl fmt::Debug for ScreenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenRegistry")
            .field("screens", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockScreen;

    #[test]
    fn test_registry_names_sorted() {
        let registry = ScreenRegistry::new()
            .with_screen("validation", Arc::new(MockScreen::new()))
            .with_screen("capture", Arc::new(MockScreen::new()));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("capture"));
        assert!(!registry.contains("thank-you"));
        assert_eq!(registry.names(), vec!["capture", "validation"]);
    }

    #[test]
    fn test_error_display_and_benign() {
        let err = ScreenError::UnknownScreen("nope".to_string());
        assert_eq!(err.to_string(), "unknown screen: nope");
        assert!(!err.is_benign());

        assert!(ScreenError::AlreadyTransitioning.is_benign());
        assert!(ScreenError::AlreadyActive("cta".to_string()).is_benign());
    }
}
