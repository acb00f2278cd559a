//! Mock screens and navigator for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::screen::{Navigator, Screen, ScreenError};

/// Mock implementation of the Screen trait.
///
/// Tracks visibility and counts enter/exit transitions. An optional delay
/// simulates animation time; the screen becomes visible at the start of
/// its enter animation.
#[derive(Debug, Default)]
pub struct MockScreen {
    visible: AtomicBool,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    delay: Duration,
}

impl MockScreen {
    /// Create a screen with instant transitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a screen whose transitions take `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Number of completed or in-flight enter transitions.
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Screen for MockScreen {
    async fn activate(&self) {
        self.activations.fetch_add(1, Ordering::SeqCst);
        self.visible.store(true, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    async fn deactivate(&self) {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.visible.store(false, Ordering::SeqCst);
    }

    fn show(&self) {
        self.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }
}

/// A recorded navigator call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigatorCall {
    Open(String),
    OpenInstant(String),
    DisableAll,
}

/// Mock implementation of the Navigator trait.
///
/// Applies the same acceptance rules as the real controller (unknown and
/// already-active targets are refused) without any animation, and records
/// every call.
///
/// # Example
///
/// ```rust,ignore
/// use totem_core::testing::MockNavigator;
///
/// let nav = MockNavigator::new(&["cta", "capture"], "cta");
/// nav.open_screen("capture").await?;
/// assert_eq!(nav.open_count("capture"), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockNavigator {
    screens: Arc<Vec<String>>,
    current: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<NavigatorCall>>>,
    /// Errors returned, in order, by the next `open_screen` calls.
    rejections: Arc<RwLock<VecDeque<ScreenError>>>,
}

impl MockNavigator {
    /// Create a navigator over `screens` with `current` visible.
    pub fn new(screens: &[&str], current: &str) -> Self {
        Self {
            screens: Arc::new(screens.iter().map(|s| s.to_string()).collect()),
            current: Arc::new(RwLock::new(Some(current.to_string()))),
            calls: Arc::new(RwLock::new(Vec::new())),
            rejections: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<NavigatorCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of animated open requests for `screen`, accepted or not.
    pub fn open_count(&self, screen: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, NavigatorCall::Open(name) if name == screen))
            .count()
    }

    pub fn disable_all_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, NavigatorCall::DisableAll))
            .count()
    }

    /// Make the next `open_screen` call fail with `error`.
    pub fn reject_next_open(&self, error: ScreenError) {
        self.rejections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Set the visible screen without recording a call.
    pub fn set_current(&self, screen: Option<&str>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = screen.map(str::to_string);
    }

    fn record(&self, call: NavigatorCall) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl Navigator for MockNavigator {
    async fn open_screen(&self, name: &str) -> Result<(), ScreenError> {
        self.record(NavigatorCall::Open(name.to_string()));

        let rejection = self
            .rejections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(err) = rejection {
            return Err(err);
        }
        if !self.is_registered(name) {
            return Err(ScreenError::UnknownScreen(name.to_string()));
        }

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_deref() == Some(name) {
            return Err(ScreenError::AlreadyActive(name.to_string()));
        }
        *current = Some(name.to_string());
        Ok(())
    }

    fn open_screen_instant(&self, name: &str) -> Result<(), ScreenError> {
        self.record(NavigatorCall::OpenInstant(name.to_string()));

        if !self.is_registered(name) {
            return Err(ScreenError::UnknownScreen(name.to_string()));
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
        Ok(())
    }

    fn disable_all(&self) {
        self.record(NavigatorCall::DisableAll);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn current_screen(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_registered(&self, name: &str) -> bool {
        self.screens.iter().any(|s| s == name)
    }
}
