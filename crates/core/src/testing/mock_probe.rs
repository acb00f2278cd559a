//! Mock health probe and maintenance trigger for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::maintenance::{HealthProbe, MaintenanceTrigger, ProbeOutcome};

/// Mock implementation of the HealthProbe trait.
///
/// Returns scripted outcomes in order, then `Healthy` once the script is
/// exhausted.
#[derive(Debug, Clone, Default)]
pub struct MockHealthProbe {
    script: Arc<RwLock<VecDeque<ProbeOutcome>>>,
    probes: Arc<AtomicUsize>,
}

impl MockHealthProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a probe that returns `outcomes` in order.
    pub fn scripted(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Self {
        let probe = Self::new();
        probe.push_outcomes(outcomes);
        probe
    }

    /// Append outcomes to the script.
    pub fn push_outcomes(&self, outcomes: impl IntoIterator<Item = ProbeOutcome>) {
        self.script
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(outcomes);
    }

    /// Number of probes performed.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for MockHealthProbe {
    async fn probe(&self) -> ProbeOutcome {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.script
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(ProbeOutcome::Healthy)
    }
}

/// Mock implementation of the MaintenanceTrigger trait. Counts activations.
#[derive(Debug, Clone, Default)]
pub struct MockMaintenanceTrigger {
    activations: Arc<AtomicUsize>,
}

impl MockMaintenanceTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activation_count(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MaintenanceTrigger for MockMaintenanceTrigger {
    async fn activate_maintenance(&self) {
        self.activations.fetch_add(1, Ordering::SeqCst);
    }
}
