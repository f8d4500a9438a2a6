//! Worker thread implementation

use crate::core::error::panic_message;
use crate::core::{set_current_thread_id, JobContext, SharedJob, ThreadId};
use crate::queue::JobQueue;
use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{debug, span, Level};

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Total number of jobs processed
    pub jobs_processed: AtomicU64,
    /// Total number of jobs that panicked
    pub jobs_panicked: AtomicU64,
    /// Number of activations this worker answered
    pub activations: AtomicU64,
    /// Total time spent processing jobs (microseconds)
    pub total_processing_time_us: AtomicU64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment jobs processed counter
    pub fn increment_processed(&self) {
        self.jobs_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment jobs panicked counter
    pub fn increment_panicked(&self) {
        self.jobs_panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment activations counter
    pub fn increment_activations(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    /// Add processing time
    pub fn add_processing_time(&self, microseconds: u64) {
        self.total_processing_time_us
            .fetch_add(microseconds, Ordering::Relaxed);
    }

    /// Get total jobs processed
    pub fn get_jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    /// Get total jobs panicked
    pub fn get_jobs_panicked(&self) -> u64 {
        self.jobs_panicked.load(Ordering::Relaxed)
    }

    /// Get number of activations
    pub fn get_activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    /// Get average processing time per job in microseconds
    pub fn get_average_processing_time_us(&self) -> f64 {
        let total = self.total_processing_time_us.load(Ordering::Relaxed);
        let count = self.jobs_processed.load(Ordering::Relaxed)
            + self.jobs_panicked.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }
}

/// State shared between the pool and its workers.
///
/// Activation and completion are signalled on separate lock/condvar pairs so that a worker
/// reporting idle never contends with the thread that is waking workers.
#[derive(Debug, Default)]
pub(crate) struct PoolShared {
    /// The queue currently being drained
    pub(crate) hook: RwLock<Option<Arc<JobQueue>>>,
    pub(crate) notify_lock: Mutex<()>,
    pub(crate) notify: Condvar,
    pub(crate) response_lock: Mutex<()>,
    pub(crate) response: Condvar,
}

/// A pool slot bound to one persistent thread
#[derive(Debug)]
pub struct Worker {
    thread_id: ThreadId,
    shared: Arc<PoolShared>,
    is_running: CachePadded<AtomicBool>,
    terminate: CachePadded<AtomicBool>,
    spawned: AtomicBool,
    stats: Arc<WorkerStats>,
}

impl Worker {
    pub(crate) fn new(thread_id: ThreadId, shared: Arc<PoolShared>) -> Self {
        Self {
            thread_id,
            shared,
            is_running: CachePadded::new(AtomicBool::new(false)),
            terminate: CachePadded::new(AtomicBool::new(false)),
            spawned: AtomicBool::new(false),
            stats: Arc::new(WorkerStats::new()),
        }
    }

    /// Identity this worker runs jobs under
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Whether the worker has been activated and not yet reported idle
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Whether the worker's thread was created
    pub fn is_spawned(&self) -> bool {
        self.spawned.load(Ordering::Acquire)
    }

    pub(crate) fn mark_spawned(&self) {
        self.spawned.store(true, Ordering::Release);
    }

    /// Mark the worker active. Must land before the wake notification is sent.
    pub(crate) fn activate(&self) {
        self.is_running.store(true, Ordering::Release);
    }

    /// Ask the worker loop to exit
    pub(crate) fn terminate(&self) {
        self.terminate.store(true, Ordering::Release);
    }

    fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    /// Drain `queue` on the calling thread under `thread_id`.
    ///
    /// Returns the number of jobs executed.
    pub fn run_jobs(queue: &JobQueue, thread_id: ThreadId) -> usize {
        Self::drain(queue, thread_id, None)
    }

    fn drain(queue: &JobQueue, thread_id: ThreadId, stats: Option<&WorkerStats>) -> usize {
        set_current_thread_id(thread_id);
        let ctx = JobContext::new(thread_id);

        let mut executed = 0;
        while let Some(job) = queue.pop() {
            Self::execute_job(&job, &ctx, stats);
            executed += 1;
        }
        executed
    }

    /// Run one job through its callbacks with panic protection
    fn execute_job(job: &SharedJob, ctx: &JobContext, stats: Option<&WorkerStats>) {
        #[cfg(feature = "tracing")]
        let job_span = span!(Level::DEBUG, "job_execution", job_type = job.job_type());
        #[cfg(feature = "tracing")]
        let _job_guard = job_span.enter();

        // Nested contexts may have rewritten the slot since the last job
        set_current_thread_id(ctx.thread_id());

        let start = Instant::now();
        let run_result = catch_unwind(AssertUnwindSafe(|| {
            job.on_start(ctx);
            job.on_run(ctx);
        }));

        if let Err(panic_info) = &run_result {
            log::error!(
                "thread {}: job {} panicked: {}",
                ctx.thread_id(),
                job.job_type(),
                panic_message(panic_info.as_ref())
            );
        }

        if let Err(panic_info) = catch_unwind(AssertUnwindSafe(|| job.on_finished(ctx))) {
            log::error!(
                "thread {}: job {} panicked while finishing: {}",
                ctx.thread_id(),
                job.job_type(),
                panic_message(panic_info.as_ref())
            );
        }

        let elapsed = start.elapsed();

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_completion(elapsed, run_result.is_ok());

        if let Some(stats) = stats {
            if run_result.is_ok() {
                stats.increment_processed();
            } else {
                stats.increment_panicked();
            }
            stats.add_processing_time(elapsed.as_micros() as u64);
        }
    }

    /// Main loop of a pooled thread
    pub(crate) fn on_pooled_run(&self) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = self.thread_id.get());
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        set_current_thread_id(self.thread_id);
        log::debug!("worker {} started", self.thread_id);

        loop {
            {
                let mut guard = self.shared.notify_lock.lock();
                self.shared
                    .notify
                    .wait_while(&mut guard, |_| !self.is_running() && !self.is_terminated());
            }

            if self.is_terminated() {
                self.report_idle();
                break;
            }

            self.stats.increment_activations();

            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_worker_busy(self.thread_id.get());

            let queue = self.shared.hook.read().clone();
            if let Some(queue) = queue {
                Self::drain(&queue, self.thread_id, Some(&self.stats));
            }

            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_worker_idle(self.thread_id.get());

            self.report_idle();
        }

        #[cfg(feature = "tracing")]
        debug!(
            jobs_processed = self.stats.get_jobs_processed(),
            jobs_panicked = self.stats.get_jobs_panicked(),
            "worker shutting down"
        );
        log::debug!("worker {} exiting", self.thread_id);
    }

    fn report_idle(&self) {
        let _guard = self.shared.response_lock.lock();
        self.is_running.store(false, Ordering::Release);
        self.shared.response.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{current_thread_id, ClosureJob, Job};
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn queue_of(jobs: Vec<SharedJob>) -> Arc<JobQueue> {
        let queue = Arc::new(JobQueue::new("worker-test"));
        for job in jobs {
            queue.push(job);
        }
        queue.flush();
        queue
    }

    struct OrderedJob {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Job for OrderedJob {
        fn on_start(&self, _ctx: &JobContext) {
            self.log.lock().push("start");
        }

        fn on_run(&self, _ctx: &JobContext) {
            self.log.lock().push("run");
        }

        fn on_finished(&self, _ctx: &JobContext) {
            self.log.lock().push("finished");
        }
    }

    #[test]
    fn test_run_jobs_invokes_callbacks_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = queue_of(vec![Arc::new(OrderedJob {
            log: Arc::clone(&log),
        }) as SharedJob]);

        assert_eq!(Worker::run_jobs(&queue, ThreadId::new(3)), 1);
        assert_eq!(*log.lock(), vec!["start", "run", "finished"]);
        assert_eq!(current_thread_id(), Some(ThreadId::new(3)));
    }

    #[test]
    fn test_run_jobs_reasserts_identity_per_job() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let jobs: Vec<SharedJob> = (0..3)
            .map(|_| {
                let seen = Arc::clone(&seen);
                Arc::new(ClosureJob::new(move |_: &JobContext| {
                    seen.lock().push(current_thread_id());
                    // Simulate a nested context clobbering the slot
                    set_current_thread_id(ThreadId::new(99));
                })) as SharedJob
            })
            .collect();
        let queue = queue_of(jobs);

        Worker::run_jobs(&queue, ThreadId::new(5));
        assert_eq!(*seen.lock(), vec![Some(ThreadId::new(5)); 3]);
    }

    #[test]
    fn test_panicking_job_is_contained_and_finished() {
        let finished = Arc::new(AtomicUsize::new(0));

        struct Exploding {
            finished: Arc<AtomicUsize>,
        }

        impl Job for Exploding {
            fn on_run(&self, _ctx: &JobContext) {
                panic!("Intentional panic for testing");
            }

            fn on_finished(&self, _ctx: &JobContext) {
                self.finished.fetch_add(1, Ordering::SeqCst);
            }
        }

        let after = Arc::new(AtomicUsize::new(0));
        let after_clone = Arc::clone(&after);
        let queue = queue_of(vec![
            Arc::new(Exploding {
                finished: Arc::clone(&finished),
            }) as SharedJob,
            Arc::new(ClosureJob::new(move |_: &JobContext| {
                after_clone.fetch_add(1, Ordering::SeqCst);
            })) as SharedJob,
        ]);

        let stats = WorkerStats::new();
        assert_eq!(Worker::drain(&queue, ThreadId::new(1), Some(&stats)), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert_eq!(stats.get_jobs_panicked(), 1);
        assert_eq!(stats.get_jobs_processed(), 1);
    }

    #[test]
    fn test_pooled_loop_reports_idle_with_empty_hook() {
        let shared = Arc::new(PoolShared::default());
        let worker = Arc::new(Worker::new(ThreadId::new(1), Arc::clone(&shared)));

        let handle = {
            let worker = Arc::clone(&worker);
            thread::spawn(move || worker.on_pooled_run())
        };

        {
            let _guard = shared.notify_lock.lock();
            worker.activate();
        }
        shared.notify.notify_all();

        {
            let mut guard = shared.response_lock.lock();
            shared
                .response
                .wait_while_for(&mut guard, |_| worker.is_running(), Duration::from_secs(5));
        }
        assert!(!worker.is_running());

        {
            let _guard = shared.notify_lock.lock();
            worker.terminate();
        }
        shared.notify.notify_all();
        handle.join().expect("worker thread panicked");
        assert_eq!(worker.stats().get_activations(), 1);
    }
}
