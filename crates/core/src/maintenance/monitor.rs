//! Maintenance monitor implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::screen::{Navigator, ScreenError};
use crate::session::{KioskEvent, SessionLogHandle};

use super::config::MonitorConfig;
use super::probe::HealthProbe;
use super::types::{MaintenanceMode, MaintenanceState, MaintenanceTrigger, ProbeOutcome};

#[derive(Debug)]
struct MonitorState {
    mode: MaintenanceMode,
    held: bool,
    consecutive_failures: u32,
    last_probe: Option<ProbeOutcome>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            mode: MaintenanceMode::Normal,
            held: false,
            consecutive_failures: 0,
            last_probe: None,
        }
    }
}

/// Probes server health and switches between the call-to-action flow and the
/// maintenance screen.
///
/// Every state change goes through this type's own methods; the state lock is
/// held for the whole change, including the screen switch, so collaborators
/// never observe a half-applied transition.
pub struct MaintenanceMonitor {
    config: MonitorConfig,
    probe: Arc<dyn HealthProbe>,
    navigator: Arc<dyn Navigator>,
    cta_screen: String,
    maintenance_screen: String,
    session_log: Option<SessionLogHandle>,

    state: Mutex<MonitorState>,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl MaintenanceMonitor {
    pub fn new(
        config: MonitorConfig,
        probe: Arc<dyn HealthProbe>,
        navigator: Arc<dyn Navigator>,
        cta_screen: impl Into<String>,
        maintenance_screen: impl Into<String>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            probe,
            navigator,
            cta_screen: cta_screen.into(),
            maintenance_screen: maintenance_screen.into(),
            session_log: None,
            state: Mutex::new(MonitorState::default()),
            running: AtomicBool::new(false),
            shutdown_tx,
            task: StdMutex::new(None),
        }
    }

    pub fn with_session_log(mut self, handle: SessionLogHandle) -> Self {
        self.session_log = Some(handle);
        self
    }

    pub fn maintenance_screen(&self) -> &str {
        &self.maintenance_screen
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start the probe loop. Starting twice is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("Maintenance monitor already running");
            return;
        }

        info!(
            interval_secs = self.config.poll_interval_secs,
            timeout_secs = self.config.request_timeout_secs,
            "Maintenance monitor started"
        );

        let monitor = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                let outcome = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    outcome = monitor.probe.probe() => outcome,
                };
                monitor.apply_probe(outcome).await;

                // Re-armed regardless of the outcome
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(monitor.config.poll_interval()) => {}
                }
            }
            debug!("Maintenance probe loop stopped");
        });

        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Stop the probe loop, interrupting a pending wait. Stopping a stopped
    /// monitor is a no-op.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            debug!("Maintenance monitor not running");
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
                error!("Maintenance probe loop ended abnormally: {}", e);
            }
        }

        info!("Maintenance monitor stopped");
    }

    /// Run one probe and apply its outcome.
    pub async fn check_once(&self) -> MaintenanceMode {
        let outcome = self.probe.probe().await;
        self.apply_probe(outcome).await
    }

    /// Apply a probe outcome to the state machine, returning the resulting mode.
    pub async fn apply_probe(&self, outcome: ProbeOutcome) -> MaintenanceMode {
        let mut state = self.state.lock().await;
        state.last_probe = Some(outcome);

        match outcome {
            ProbeOutcome::Healthy => state.consecutive_failures = 0,
            ProbeOutcome::Unreachable | ProbeOutcome::Degraded => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1)
            }
            ProbeOutcome::Unhandled(_) => {}
        }

        match (state.mode, outcome) {
            (_, ProbeOutcome::Unhandled(status)) => {
                warn!(status, "Health status not handled explicitly, keeping state");
            }
            (MaintenanceMode::Normal, ProbeOutcome::Healthy) => {
                debug!("Server healthy, nothing to do");
            }
            (MaintenanceMode::Normal, failure) => {
                warn!(
                    outcome = failure.as_str(),
                    failures = state.consecutive_failures,
                    "Server check failed, entering maintenance"
                );
                self.enter_maintenance(&mut state, failure.as_str()).await;
            }
            (MaintenanceMode::Maintenance, ProbeOutcome::Healthy) if state.held => {
                info!("Server healthy but maintenance is held, staying in maintenance");
            }
            (MaintenanceMode::Maintenance, ProbeOutcome::Healthy) => {
                info!("Server healthy, leaving maintenance");
                self.exit_maintenance(&mut state).await;
            }
            (MaintenanceMode::Maintenance, failure) => {
                debug!(outcome = failure.as_str(), "Already in maintenance, keeping state");
            }
        }

        state.mode
    }

    /// Force maintenance. Idempotent.
    pub async fn activate_maintenance(&self) {
        let mut state = self.state.lock().await;
        if state.mode == MaintenanceMode::Maintenance && self.maintenance_visible() {
            debug!("Maintenance already active");
            return;
        }
        self.enter_maintenance(&mut state, "escalation").await;
    }

    /// Force maintenance and set the sticky hold. Redundant calls while held
    /// and active are no-ops.
    pub async fn activate_maintenance_hold(&self) {
        let mut state = self.state.lock().await;
        let was_held = state.held;
        state.held = true;
        if !was_held {
            self.emit(KioskEvent::MaintenanceHoldChanged { held: true })
                .await;
        }

        if state.mode == MaintenanceMode::Maintenance && self.maintenance_visible() {
            if was_held {
                info!("Maintenance already held and active");
            } else {
                info!("Maintenance hold set");
            }
            return;
        }
        self.enter_maintenance(&mut state, "operator_hold").await;
    }

    /// Operator toggle.
    ///
    /// From normal: set the hold and force maintenance. From maintenance:
    /// clear the hold and restore the call-to-action screen, unless the last
    /// probe says the server is still unhealthy.
    pub async fn toggle_hold(&self) -> MaintenanceMode {
        let mut state = self.state.lock().await;
        match state.mode {
            MaintenanceMode::Normal => {
                state.held = true;
                self.emit(KioskEvent::MaintenanceHoldChanged { held: true })
                    .await;
                self.enter_maintenance(&mut state, "operator_toggle").await;
            }
            MaintenanceMode::Maintenance => {
                if state.held {
                    state.held = false;
                    self.emit(KioskEvent::MaintenanceHoldChanged { held: false })
                        .await;
                }
                match state.last_probe {
                    Some(outcome) if outcome.is_failure() => {
                        info!(
                            outcome = outcome.as_str(),
                            "Hold released but server still unhealthy, staying in maintenance"
                        );
                    }
                    _ => self.exit_maintenance(&mut state).await,
                }
            }
        }
        state.mode
    }

    /// True only while the hold is set and the maintenance screen is visible.
    pub async fn is_held(&self) -> bool {
        let state = self.state.lock().await;
        state.held && self.maintenance_visible()
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.mode == MaintenanceMode::Maintenance
    }

    pub async fn state(&self) -> MaintenanceState {
        let state = self.state.lock().await;
        MaintenanceState {
            mode: state.mode,
            active: self.maintenance_visible(),
            held: state.held,
            consecutive_failures: state.consecutive_failures,
            last_probe: state.last_probe,
        }
    }

    fn maintenance_visible(&self) -> bool {
        self.navigator.current_screen().as_deref() == Some(self.maintenance_screen.as_str())
    }

    async fn enter_maintenance(&self, state: &mut MonitorState, reason: &str) {
        self.navigator.disable_all();
        if let Err(e) = self.navigator.open_screen_instant(&self.maintenance_screen) {
            error!("Failed to show maintenance screen: {}", e);
        }
        state.mode = MaintenanceMode::Maintenance;

        info!(reason, held = state.held, "Maintenance mode entered");
        self.emit(KioskEvent::MaintenanceEntered {
            reason: reason.to_string(),
        })
        .await;
    }

    async fn exit_maintenance(&self, state: &mut MonitorState) {
        match self.navigator.open_screen(&self.cta_screen).await {
            Ok(()) | Err(ScreenError::AlreadyActive(_)) => {
                state.mode = MaintenanceMode::Normal;
                info!(screen = %self.cta_screen, "Maintenance mode exited");
                self.emit(KioskEvent::MaintenanceExited).await;
            }
            Err(e) => {
                warn!("Could not restore call-to-action screen, retrying on next probe: {}", e);
            }
        }
    }

    async fn emit(&self, event: KioskEvent) {
        if let Some(ref log) = self.session_log {
            log.emit(event).await;
        }
    }
}

#[async_trait]
impl MaintenanceTrigger for MaintenanceMonitor {
    async fn activate_maintenance(&self) {
        MaintenanceMonitor::activate_maintenance(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockHealthProbe, MockNavigator, NavigatorCall};

    fn monitor_with(navigator: Arc<MockNavigator>, probe: Arc<MockHealthProbe>) -> MaintenanceMonitor {
        MaintenanceMonitor::new(
            MonitorConfig {
                poll_interval_secs: 0.01,
                ..Default::default()
            },
            probe,
            navigator,
            "cta",
            "maintenance",
        )
    }

    fn navigator() -> Arc<MockNavigator> {
        Arc::new(MockNavigator::new(&["cta", "capture", "maintenance"], "cta"))
    }

    #[tokio::test]
    async fn test_scripted_sequence() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        let mut modes = Vec::new();
        for outcome in [
            ProbeOutcome::Unreachable,
            ProbeOutcome::Healthy,
            ProbeOutcome::Healthy,
        ] {
            modes.push(monitor.apply_probe(outcome).await);
        }

        assert_eq!(
            modes,
            vec![
                MaintenanceMode::Maintenance,
                MaintenanceMode::Normal,
                MaintenanceMode::Normal
            ]
        );
        assert_eq!(nav.current_screen().as_deref(), Some("cta"));
    }

    #[tokio::test]
    async fn test_degraded_enters_maintenance() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        assert_eq!(
            monitor.apply_probe(ProbeOutcome::Degraded).await,
            MaintenanceMode::Maintenance
        );
        assert_eq!(nav.current_screen().as_deref(), Some("maintenance"));
        assert_eq!(nav.disable_all_count(), 1);
    }

    #[tokio::test]
    async fn test_failures_while_in_maintenance_are_noops() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        monitor.apply_probe(ProbeOutcome::Unreachable).await;
        monitor.apply_probe(ProbeOutcome::Degraded).await;
        monitor.apply_probe(ProbeOutcome::Unreachable).await;

        assert_eq!(nav.disable_all_count(), 1);
        let state = monitor.state().await;
        assert_eq!(state.consecutive_failures, 3);
        assert_eq!(state.last_probe, Some(ProbeOutcome::Unreachable));
    }

    #[tokio::test]
    async fn test_unhandled_status_keeps_state() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        assert_eq!(
            monitor.apply_probe(ProbeOutcome::Unhandled(503)).await,
            MaintenanceMode::Normal
        );
        monitor.apply_probe(ProbeOutcome::Unreachable).await;
        assert_eq!(
            monitor.apply_probe(ProbeOutcome::Unhandled(503)).await,
            MaintenanceMode::Maintenance
        );
        assert!(nav.calls().iter().all(|c| !matches!(c, NavigatorCall::Open(_))));
    }

    #[tokio::test]
    async fn test_hold_suppresses_recovery() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        monitor.activate_maintenance_hold().await;
        assert!(monitor.is_held().await);

        assert_eq!(
            monitor.apply_probe(ProbeOutcome::Healthy).await,
            MaintenanceMode::Maintenance
        );
        assert_eq!(nav.current_screen().as_deref(), Some("maintenance"));
    }

    #[tokio::test]
    async fn test_hold_is_idempotent() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        monitor.activate_maintenance_hold().await;
        monitor.activate_maintenance_hold().await;

        assert_eq!(nav.disable_all_count(), 1);
        assert!(monitor.is_held().await);
    }

    #[tokio::test]
    async fn test_held_requires_visible_maintenance_screen() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        monitor.activate_maintenance_hold().await;
        // Someone switched screens behind the monitor's back
        nav.open_screen_instant("capture").unwrap();

        assert!(!monitor.is_held().await);
        assert!(!monitor.state().await.active);
    }

    #[tokio::test]
    async fn test_activate_maintenance_is_idempotent() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        monitor.activate_maintenance().await;
        MaintenanceTrigger::activate_maintenance(&monitor).await;

        assert_eq!(nav.disable_all_count(), 1);
        assert!(monitor.is_active().await);
        assert!(!monitor.is_held().await);
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        assert_eq!(monitor.toggle_hold().await, MaintenanceMode::Maintenance);
        assert!(monitor.is_held().await);

        assert_eq!(monitor.toggle_hold().await, MaintenanceMode::Normal);
        assert!(!monitor.is_held().await);
        assert_eq!(nav.current_screen().as_deref(), Some("cta"));
    }

    #[tokio::test]
    async fn test_toggle_does_not_restore_while_unhealthy() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        monitor.activate_maintenance_hold().await;
        monitor.apply_probe(ProbeOutcome::Unreachable).await;

        assert_eq!(monitor.toggle_hold().await, MaintenanceMode::Maintenance);
        let state = monitor.state().await;
        assert!(!state.held);
        assert_eq!(nav.current_screen().as_deref(), Some("maintenance"));

        // Next healthy probe recovers on its own
        assert_eq!(
            monitor.apply_probe(ProbeOutcome::Healthy).await,
            MaintenanceMode::Normal
        );
    }

    #[tokio::test]
    async fn test_failed_restore_retries_on_next_probe() {
        let nav = navigator();
        let monitor = monitor_with(Arc::clone(&nav), Arc::new(MockHealthProbe::new()));

        monitor.apply_probe(ProbeOutcome::Unreachable).await;
        nav.reject_next_open(ScreenError::AlreadyTransitioning);

        assert_eq!(
            monitor.apply_probe(ProbeOutcome::Healthy).await,
            MaintenanceMode::Maintenance
        );
        assert_eq!(
            monitor.apply_probe(ProbeOutcome::Healthy).await,
            MaintenanceMode::Normal
        );
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let nav = navigator();
        let probe = Arc::new(MockHealthProbe::new());
        let monitor = Arc::new(monitor_with(Arc::clone(&nav), Arc::clone(&probe)));

        monitor.stop().await;
        monitor.start();
        monitor.start();
        assert!(monitor.is_running());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        monitor.stop().await;
        assert!(!monitor.is_running());
        assert!(probe.probe_count() >= 2);

        let count = probe.probe_count();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(probe.probe_count(), count);
    }
}
