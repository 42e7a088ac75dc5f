//! Orchestrator counters.
//!
//! Plain atomics: both loops write, the status API reads, and nothing
//! needs a consistent cross-counter view.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters for the watcher and supervisor loops.
#[derive(Debug, Default)]
pub struct OrchestratorMetrics {
    watcher_ticks: AtomicU64,
    watcher_tick_failures: AtomicU64,
    topics_provisioned: AtomicU64,
    provision_failures: AtomicU64,
    supervisor_sweeps: AtomicU64,
    supervisor_sweep_failures: AtomicU64,
    restarts_attempted: AtomicU64,
    restarts_succeeded: AtomicU64,
    restarts_failed: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub watcher_ticks: u64,
    pub watcher_tick_failures: u64,
    pub topics_provisioned: u64,
    pub provision_failures: u64,
    pub supervisor_sweeps: u64,
    pub supervisor_sweep_failures: u64,
    pub restarts_attempted: u64,
    pub restarts_succeeded: u64,
    pub restarts_failed: u64,
}

impl OrchestratorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A watcher tick ran; `ok` is false when the topic listing failed.
    pub fn record_watcher_tick(&self, ok: bool) {
        self.watcher_ticks.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.watcher_tick_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_provision(&self, ok: bool) {
        if ok {
            self.topics_provisioned.fetch_add(1, Ordering::Relaxed);
        } else {
            self.provision_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A supervisor sweep ran; `ok` is false when the pipeline listing failed.
    pub fn record_sweep(&self, ok: bool) {
        self.supervisor_sweeps.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.supervisor_sweep_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_restart(&self, ok: bool) {
        self.restarts_attempted.fetch_add(1, Ordering::Relaxed);
        if ok {
            self.restarts_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.restarts_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            watcher_ticks: self.watcher_ticks.load(Ordering::Relaxed),
            watcher_tick_failures: self.watcher_tick_failures.load(Ordering::Relaxed),
            topics_provisioned: self.topics_provisioned.load(Ordering::Relaxed),
            provision_failures: self.provision_failures.load(Ordering::Relaxed),
            supervisor_sweeps: self.supervisor_sweeps.load(Ordering::Relaxed),
            supervisor_sweep_failures: self.supervisor_sweep_failures.load(Ordering::Relaxed),
            restarts_attempted: self.restarts_attempted.load(Ordering::Relaxed),
            restarts_succeeded: self.restarts_succeeded.load(Ordering::Relaxed),
            restarts_failed: self.restarts_failed.load(Ordering::Relaxed),
        }
    }
}
