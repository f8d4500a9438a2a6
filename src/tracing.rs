//! Tracing integration for observability.
//!
//! This module provides span propagation for jobs and, when the `tracing` feature is enabled,
//! trace events for pool cycles, worker activity and tick phases.
//!
//! # Example
//!
//! ```rust,ignore
//! use frame_scheduler::prelude::*;
//! use frame_scheduler::tracing::TracedJob;
//! use std::sync::Arc;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("frame_scheduler=debug".parse().unwrap()))
//!     .init();
//!
//! let manager = ScheduleManager::new(ScheduleConfig::new())?;
//! manager.on_pre_init()?;
//!
//! // The submitting span is entered again on whichever thread runs the job
//! manager.register_job(Arc::new(TracedJob::new(MyJob::new())), QueueKind::Worker);
//! ```

use crate::core::{Job, JobContext};
#[cfg(feature = "tracing")]
use std::time::Duration;

/// A job wrapper that propagates tracing context across thread boundaries.
///
/// The span current at construction is entered around each callback, so the job's own events
/// nest under the code that submitted it rather than under the worker.
pub struct TracedJob<J: Job> {
    inner: J,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<J: Job> TracedJob<J> {
    /// Wrap `job`, capturing the current span
    pub fn new(job: J) -> Self {
        Self {
            inner: job,
            #[cfg(feature = "tracing")]
            span: tracing::Span::current(),
        }
    }

    /// Wrap `job` with a specific span
    #[cfg(feature = "tracing")]
    pub fn with_span(job: J, span: tracing::Span) -> Self {
        Self { inner: job, span }
    }

    /// The wrapped job
    pub fn inner(&self) -> &J {
        &self.inner
    }
}

impl<J: Job> Job for TracedJob<J> {
    fn on_start(&self, ctx: &JobContext) {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();
        self.inner.on_start(ctx)
    }

    fn on_run(&self, ctx: &JobContext) {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();
        self.inner.on_run(ctx)
    }

    fn on_finished(&self, ctx: &JobContext) {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();
        self.inner.on_finished(ctx)
    }

    fn job_type(&self) -> &str {
        self.inner.job_type()
    }
}

/// Metrics recording functions for observability.
///
/// These functions emit tracing events that can be consumed by
/// metrics collection systems like Prometheus via tracing-opentelemetry.
#[cfg(feature = "tracing")]
pub mod metrics {
    use super::*;

    /// Records the start of a pool cycle.
    #[inline]
    pub fn record_cycle_start(queue: &str, queue_size: usize) {
        tracing::trace!(
            counter.cycles_started = 1,
            gauge.cycle_size = queue_size as i64,
            queue = queue,
            "pool cycle started"
        );
    }

    /// Records job completion with timing.
    #[inline]
    pub fn record_completion(duration: Duration, success: bool) {
        let duration_ms = duration.as_millis() as u64;
        if success {
            tracing::trace!(
                counter.jobs_completed = 1,
                histogram.job_duration_ms = duration_ms,
                "job completed successfully"
            );
        } else {
            tracing::trace!(
                counter.jobs_panicked = 1,
                histogram.job_duration_ms = duration_ms,
                "job panicked"
            );
        }
    }

    /// Records a finished tick phase.
    #[inline]
    pub fn record_phase(phase: &str, jobs: usize, duration: Duration) {
        tracing::trace!(
            phase = phase,
            counter.phase_jobs = jobs as u64,
            histogram.phase_duration_us = duration.as_micros() as u64,
            "phase finished"
        );
    }

    /// Records worker becoming busy.
    #[inline]
    pub fn record_worker_busy(worker_id: u32) {
        tracing::trace!(
            gauge.workers_busy = 1,
            worker_id = worker_id,
            "worker busy"
        );
    }

    /// Records worker becoming idle.
    #[inline]
    pub fn record_worker_idle(worker_id: u32) {
        tracing::trace!(
            gauge.workers_busy = -1i64,
            worker_id = worker_id,
            "worker idle"
        );
    }

    /// Records pool startup.
    #[inline]
    pub fn record_pool_start(live_workers: usize, capacity: usize) {
        tracing::info!(
            workers = live_workers,
            capacity = capacity,
            "thread pool started"
        );
    }

    /// Records pool shutdown.
    #[inline]
    pub fn record_pool_shutdown(jobs_processed: u64, jobs_panicked: u64) {
        tracing::info!(
            jobs_processed = jobs_processed,
            jobs_panicked = jobs_panicked,
            "thread pool shutdown complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClosureJob, ThreadId};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_traced_job_executes() {
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        let job = ClosureJob::new(move |_: &JobContext| {
            executed_clone.store(true, Ordering::SeqCst);
        });

        let traced = TracedJob::new(job);
        traced.on_run(&JobContext::new(ThreadId::MAIN));

        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_traced_job_preserves_job_type() {
        let job = ClosureJob::with_name(|_: &JobContext| {}, "Physics");
        let traced = TracedJob::new(job);

        assert_eq!(traced.job_type(), "Physics");
        assert_eq!(traced.inner().job_type(), "Physics");
    }
}
