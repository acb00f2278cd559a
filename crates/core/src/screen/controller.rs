//! Screen controller implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::session::{KioskEvent, SessionLogHandle, SessionStore};

use super::types::{Navigator, Screen, ScreenError, ScreenRegistry};

/// Which screen is visible, plus a counter bumped by every instant change so
/// an animated transition can tell it was overtaken.
#[derive(Debug, Default)]
struct ActiveScreen {
    name: Option<String>,
    generation: u64,
}

/// Clears the in-flight flag even if the transition future is dropped.
struct TransitionGuard<'a>(&'a AtomicBool);

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the current-screen pointer and serializes transitions.
pub struct ScreenController {
    screens: ScreenRegistry,
    main_screen: String,
    active: Mutex<ActiveScreen>,
    transitioning: AtomicBool,
    session_store: Option<SessionStore>,
    session_log: Option<SessionLogHandle>,
}

impl ScreenController {
    /// Create a controller; `main_screen` must be registered.
    pub fn new(screens: ScreenRegistry, main_screen: impl Into<String>) -> Result<Self, ScreenError> {
        let main_screen = main_screen.into();
        if !screens.contains(&main_screen) {
            return Err(ScreenError::UnknownScreen(main_screen));
        }

        Ok(Self {
            screens,
            main_screen,
            active: Mutex::new(ActiveScreen::default()),
            transitioning: AtomicBool::new(false),
            session_store: None,
            session_log: None,
        })
    }

    /// Clear a screen's session scope whenever that screen is exited.
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_session_log(mut self, handle: SessionLogHandle) -> Self {
        self.session_log = Some(handle);
        self
    }

    pub fn main_screen(&self) -> &str {
        &self.main_screen
    }

    pub fn screen_names(&self) -> Vec<String> {
        self.screens.names()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning.load(Ordering::Acquire)
    }

    fn active(&self) -> MutexGuard<'_, ActiveScreen> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show the main screen and hide every other one.
    pub async fn initialize(&self) {
        {
            let mut active = self.active();
            for (name, screen) in self.screens.iter() {
                if *name == self.main_screen {
                    screen.show();
                } else {
                    screen.hide();
                }
            }
            active.name = Some(self.main_screen.clone());
            active.generation += 1;
        }

        info!(screen = %self.main_screen, "Main screen shown");
        self.emit_opened(&self.main_screen).await;
    }

    /// Animated transition to `name`.
    ///
    /// Rejected with `AlreadyTransitioning` while another transition runs, with
    /// `UnknownScreen` for unregistered names and with `AlreadyActive` when the
    /// target is already visible. Only a completed transition is logged.
    pub async fn open_screen(&self, name: &str) -> Result<(), ScreenError> {
        if self.transitioning.swap(true, Ordering::AcqRel) {
            warn!(screen = name, "Transition already in progress, ignoring request");
            return Err(ScreenError::AlreadyTransitioning);
        }
        let _guard = TransitionGuard(&self.transitioning);

        let next = match self.screens.get(name) {
            Some(screen) => Arc::clone(screen),
            None => {
                warn!(screen = name, "Screen not found");
                return Err(ScreenError::UnknownScreen(name.to_string()));
            }
        };

        let (previous, generation) = {
            let active = self.active();
            (active.name.clone(), active.generation)
        };

        if previous.as_deref() == Some(name) {
            debug!(screen = name, "Screen already active");
            return Err(ScreenError::AlreadyActive(name.to_string()));
        }

        if let Some(previous) = previous.as_deref() {
            if let Some(screen) = self.screens.get(previous) {
                screen.deactivate().await;
            }
            self.leave(previous);
        }

        next.activate().await;

        {
            let mut active = self.active();
            if active.generation != generation {
                // An instant switch happened mid-animation and wins.
                next.hide();
                self.leave(name);
                warn!(
                    screen = name,
                    current = ?active.name,
                    "Transition superseded by an instant screen change"
                );
                return Ok(());
            }
            active.name = Some(name.to_string());
        }

        info!(screen = name, from = ?previous, "Screen opened");
        self.emit_opened(name).await;
        Ok(())
    }

    /// Switch to `name` without animations.
    ///
    /// Not gated by the transition flag; used on recovery paths.
    pub fn open_screen_instant(&self, name: &str) -> Result<(), ScreenError> {
        let next = self.screens.get(name).ok_or_else(|| {
            warn!(screen = name, "Screen not found");
            ScreenError::UnknownScreen(name.to_string())
        })?;

        let mut active = self.active();
        if let Some(previous) = active.name.take() {
            if previous != name {
                if let Some(screen) = self.screens.get(&previous) {
                    screen.hide();
                }
                self.leave(&previous);
            }
        }
        next.show();
        active.name = Some(name.to_string());
        active.generation += 1;

        debug!(screen = name, "Screen opened instantly");
        Ok(())
    }

    /// Hide every registered screen immediately.
    pub fn disable_all(&self) {
        let mut active = self.active();
        for (_, screen) in self.screens.iter() {
            screen.hide();
        }
        if let Some(previous) = active.name.take() {
            self.leave(&previous);
        }
        active.generation += 1;

        debug!("All screens disabled");
    }

    pub fn current_screen(&self) -> Option<String> {
        self.active().name.clone()
    }

    fn leave(&self, name: &str) {
        if let Some(store) = &self.session_store {
            let cleared = store.clear_scope(name);
            if cleared > 0 {
                debug!(screen = name, cleared, "Cleared session values on screen exit");
            }
        }
    }

    async fn emit_opened(&self, name: &str) {
        if let Some(ref log) = self.session_log {
            log.emit(KioskEvent::ScreenOpened {
                screen: name.to_string(),
            })
            .await;
        }
    }
}

#[async_trait]
impl Navigator for ScreenController {
    async fn open_screen(&self, name: &str) -> Result<(), ScreenError> {
        ScreenController::open_screen(self, name).await
    }

    fn open_screen_instant(&self, name: &str) -> Result<(), ScreenError> {
        ScreenController::open_screen_instant(self, name)
    }

    fn disable_all(&self) {
        ScreenController::disable_all(self)
    }

    fn current_screen(&self) -> Option<String> {
        ScreenController::current_screen(self)
    }

    fn is_registered(&self, name: &str) -> bool {
        self.screens.contains(name)
    }
}
