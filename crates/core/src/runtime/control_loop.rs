//! The kiosk's cooperative control loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::command::{parse_token, CommandQueue};
use crate::maintenance::MaintenanceMonitor;
use crate::schedule::OperatingHours;
use crate::screen::{Navigator, ScreenError};
use crate::session::{KioskEvent, SessionLogHandle};

use super::config::RuntimeConfig;

/// Show `closed_screen` outside `hours`.
#[derive(Debug, Clone)]
pub struct HoursRule {
    pub hours: OperatingHours,
    pub closed_screen: String,
    pub check_interval: Duration,
}

/// Loop-local bookkeeping, owned by whoever drives [`KioskRuntime::tick`].
#[derive(Debug)]
pub struct RuntimeState {
    screen: Option<String>,
    entered_at: Instant,
    last_hours_check: Option<Instant>,
    closed: bool,
}

impl RuntimeState {
    pub fn new(now: Instant) -> Self {
        Self {
            screen: None,
            entered_at: now,
            last_hours_check: None,
            closed: false,
        }
    }

    /// Whether the closed screen is being shown by the hours rule.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Ties command ingestion, screen timeouts and operating hours together.
///
/// Each tick drains the newest UDP command and dispatches it, returns to the
/// main screen when the visible screen's timeout has elapsed, and applies
/// the operating-hours rule. Maintenance always wins: nothing here navigates
/// while the maintenance screen is up.
pub struct KioskRuntime {
    navigator: Arc<dyn Navigator>,
    monitor: Arc<MaintenanceMonitor>,
    main_screen: String,
    tick_interval: Duration,
    screen_timeouts: HashMap<String, Duration>,
    hours: Option<HoursRule>,
    hours_override: AtomicBool,
    session_log: Option<SessionLogHandle>,

    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl KioskRuntime {
    pub fn new(
        config: &RuntimeConfig,
        navigator: Arc<dyn Navigator>,
        monitor: Arc<MaintenanceMonitor>,
        main_screen: impl Into<String>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            navigator,
            monitor,
            main_screen: main_screen.into(),
            tick_interval: config.tick(),
            screen_timeouts: HashMap::new(),
            hours: None,
            hours_override: AtomicBool::new(false),
            session_log: None,
            running: AtomicBool::new(false),
            shutdown_tx,
            task: StdMutex::new(None),
        }
    }

    /// Return to the main screen after `timeout` on `screen`.
    pub fn with_screen_timeout(mut self, screen: impl Into<String>, timeout: Duration) -> Self {
        self.screen_timeouts.insert(screen.into(), timeout);
        self
    }

    pub fn with_hours(mut self, rule: HoursRule) -> Self {
        self.hours = Some(rule);
        self
    }

    pub fn with_session_log(mut self, handle: SessionLogHandle) -> Self {
        self.session_log = Some(handle);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn hours_override(&self) -> bool {
        self.hours_override.load(Ordering::Acquire)
    }

    /// Flip the operator override that suspends the operating-hours rule.
    /// Returns the new value.
    pub fn toggle_hours_override(&self) -> bool {
        let enabled = !self.hours_override.fetch_xor(true, Ordering::AcqRel);
        info!(enabled, "Operating hours override toggled");
        enabled
    }

    /// Spawn the loop. It owns `queue` until stopped.
    pub fn start(self: &Arc<Self>, mut queue: CommandQueue<String>) {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Control loop already running");
            return;
        }

        info!(tick_ms = self.tick_interval.as_millis() as u64, "Control loop started");

        let runtime = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut state = RuntimeState::new(Instant::now());
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(runtime.tick_interval) => {
                        runtime
                            .tick(&mut state, &mut queue, Instant::now(), Local::now().time())
                            .await;
                    }
                }
            }
            debug!("Control loop exited");
        });

        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        let _ = self.shutdown_tx.send(());
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Control loop ended abnormally: {}", e);
            }
        }

        info!("Control loop stopped");
    }

    /// One pass of the loop.
    pub async fn tick(
        &self,
        state: &mut RuntimeState,
        queue: &mut CommandQueue<String>,
        now: Instant,
        wall_clock: NaiveTime,
    ) {
        if let Some(command) = queue.drain_latest() {
            self.dispatch(state, &command).await;
        }

        self.track_screen(state, now);
        self.apply_hours(state, now, wall_clock).await;
        self.apply_timeout(state, now).await;
    }

    /// Act on one command token. Only registered screen names are acted on;
    /// anything else is dropped.
    pub async fn dispatch(&self, state: &RuntimeState, raw: &str) {
        let Some(token) = parse_token(raw) else {
            return;
        };
        self.emit(KioskEvent::CommandReceived {
            command: token.to_string(),
        })
        .await;

        if self.monitor.is_active().await {
            debug!(command = token, "Ignoring command during maintenance");
            return;
        }
        if state.closed {
            debug!(command = token, "Ignoring command while closed");
            return;
        }
        if !self.navigator.is_registered(token) {
            debug!(command = token, "Ignoring unrecognized command");
            return;
        }

        info!(command = token, "Screen change requested");
        self.open(token).await;
    }

    fn track_screen(&self, state: &mut RuntimeState, now: Instant) {
        let current = self.navigator.current_screen();
        if current != state.screen {
            state.screen = current;
            state.entered_at = now;

            // Something else replaced the closed screen (maintenance, then its
            // exit to the call-to-action screen); the next check closes again.
            if state.closed {
                if let Some(rule) = &self.hours {
                    if state.screen.as_deref() != Some(rule.closed_screen.as_str()) {
                        debug!(screen = ?state.screen, "Closed screen replaced");
                        state.closed = false;
                    }
                }
            }
        }
    }

    async fn apply_timeout(&self, state: &mut RuntimeState, now: Instant) {
        let Some(screen) = state.screen.as_deref() else {
            return;
        };
        if screen == self.main_screen || state.closed {
            return;
        }
        let Some(timeout) = self.screen_timeouts.get(screen) else {
            return;
        };
        if now.duration_since(state.entered_at) < *timeout {
            return;
        }
        if self.monitor.is_active().await || self.monitor.is_held().await {
            return;
        }

        info!(screen, timeout_secs = timeout.as_secs_f64(), "Screen timed out");
        self.open(&self.main_screen).await;
    }

    async fn apply_hours(&self, state: &mut RuntimeState, now: Instant, wall_clock: NaiveTime) {
        let Some(rule) = &self.hours else {
            return;
        };

        if self.hours_override() {
            if state.closed {
                info!("Hours override active, reopening");
                state.closed = !self.reopen().await;
            }
            return;
        }

        let due = state
            .last_hours_check
            .map_or(true, |last| now.duration_since(last) >= rule.check_interval);
        if !due {
            return;
        }
        state.last_hours_check = Some(now);

        let within = rule.hours.contains(wall_clock);
        if !within && !state.closed {
            if self.monitor.is_active().await {
                debug!("Outside operating hours, deferring to maintenance");
                return;
            }
            info!(time = %wall_clock, screen = %rule.closed_screen, "Outside operating hours");
            match self.navigator.open_screen_instant(&rule.closed_screen) {
                Ok(()) => state.closed = true,
                Err(e) => warn!("Could not show closed screen: {}", e),
            }
        } else if within && state.closed {
            info!(time = %wall_clock, "Operating hours resumed");
            state.closed = !self.reopen().await;
        }
    }

    async fn reopen(&self) -> bool {
        match self.navigator.open_screen(&self.main_screen).await {
            Ok(()) | Err(ScreenError::AlreadyActive(_)) => true,
            Err(e) => {
                warn!("Could not return to main screen: {}", e);
                false
            }
        }
    }

    async fn open(&self, screen: &str) {
        match self.navigator.open_screen(screen).await {
            Ok(()) => {}
            Err(e) if e.is_benign() => debug!(screen, "Screen change skipped: {}", e),
            Err(e) => warn!(screen, "Screen change failed: {}", e),
        }
    }

    async fn emit(&self, event: KioskEvent) {
        if let Some(ref log) = self.session_log {
            log.emit(event).await;
        }
    }
}
