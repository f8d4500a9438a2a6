//! Per-phase counters.
//!
//! Available with the `metrics` feature. Every phase run records how many jobs it drained and
//! how long it took.

use super::Phase;
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;

/// Point-in-time statistics for one phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhaseStatsSnapshot {
    /// Number of times the phase ran
    pub runs: u64,
    /// Jobs drained across all runs
    pub jobs: u64,
    /// Wall time spent in the phase across all runs
    pub total_time: Duration,
    /// Longest single run
    pub max_time: Duration,
}

impl PhaseStatsSnapshot {
    /// Average wall time per run
    pub fn average_time(&self) -> Duration {
        if self.runs == 0 {
            Duration::ZERO
        } else {
            self.total_time.div_f64(self.runs as f64)
        }
    }
}

/// Concurrent per-phase statistics table
#[derive(Debug, Default)]
pub struct PhaseMetrics {
    phases: DashMap<Phase, PhaseStatsSnapshot>,
}

impl PhaseMetrics {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one run of `phase`
    pub fn record(&self, phase: Phase, jobs: usize, elapsed: Duration) {
        let mut entry = self.phases.entry(phase).or_default();
        entry.runs += 1;
        entry.jobs += jobs as u64;
        entry.total_time += elapsed;
        entry.max_time = entry.max_time.max(elapsed);
    }

    /// Statistics for `phase`
    pub fn snapshot(&self, phase: Phase) -> PhaseStatsSnapshot {
        self.phases
            .get(&phase)
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// Forget everything recorded so far
    pub fn reset(&self) {
        self.phases.clear();
    }
}
