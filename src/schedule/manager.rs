//! The schedule manager: owns the pool and queues and walks the tick phases.

use super::config::ScheduleConfig;
use super::events::{EventBus, SchedulerEvent};
use super::groups::{GroupId, GroupPhase, ThreadGroups};
use super::loader::{Loader, LoaderStatus};
#[cfg(feature = "metrics")]
use super::metrics::{PhaseMetrics, PhaseStatsSnapshot};
use super::Phase;
use crate::core::{
    set_current_thread_id, Barrier, ClosureJob, Job, JobContext, Result, SharedJob, ThreadError,
    ThreadId,
};
use crate::pool::{OsThreadSpawner, ThreadPool, ThreadSpawner, Worker};
use crate::queue::{JobQueue, QueueKind};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Builder for [`ScheduleManager`]
pub struct ScheduleManagerBuilder {
    config: ScheduleConfig,
    pool_spawner: Arc<dyn ThreadSpawner>,
    loader_spawner: Arc<dyn ThreadSpawner>,
}

impl ScheduleManagerBuilder {
    /// Spawner used for pooled threads
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn pool_spawner(mut self, spawner: Arc<dyn ThreadSpawner>) -> Self {
        self.pool_spawner = spawner;
        self
    }

    /// Spawner used to launch the background loader task
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn loader_spawner(mut self, spawner: Arc<dyn ThreadSpawner>) -> Self {
        self.loader_spawner = spawner;
        self
    }

    /// Build the manager. No thread is started until
    /// [`on_pre_init`](ScheduleManager::on_pre_init).
    pub fn build(self) -> Result<ScheduleManager> {
        self.config.validate()?;
        let pool_config = self.config.pool_config().with_spawner(self.pool_spawner);

        Ok(ScheduleManager {
            pool: ThreadPool::with_config(pool_config)?,
            worker_queue: Arc::new(JobQueue::new(QueueKind::Worker.name())),
            main_queue: Arc::new(JobQueue::new(QueueKind::Main.name())),
            sync_queue: Arc::new(JobQueue::new(QueueKind::Synchronise.name())),
            event_queue: Arc::new(JobQueue::new(QueueKind::Event.name())),
            loader: Loader::new(self.loader_spawner),
            groups: ThreadGroups::default(),
            events: EventBus::new(),
            tick: AtomicU64::new(0),
            tick_lock: Mutex::new(()),
            loader_status: Mutex::new(LoaderStatus::Idle),
            #[cfg(feature = "metrics")]
            metrics: PhaseMetrics::new(),
            config: self.config,
        })
    }
}

/// Drives the per-tick phases over a persistent worker pool.
///
/// # Lifecycle
///
/// 1. [`on_pre_init`](Self::on_pre_init) starts the pool and hands every execution context
///    its identity.
/// 2. Each tick calls [`on_update`](Self::on_update), [`on_synchronise`](Self::on_synchronise)
///    and [`on_process_events`](Self::on_process_events) from the main thread.
/// 3. [`on_release`](Self::on_release) stops the pool and waits for the loader.
///
/// Jobs can be registered from any thread at any time, including from inside running jobs;
/// they take effect at the next flush of their queue.
///
/// # Example
///
/// ```rust
/// use frame_scheduler::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let manager = ScheduleManager::new(ScheduleConfig::new().with_max_worker_threads(2))?;
/// manager.on_pre_init()?;
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..8 {
///     let counter = Arc::clone(&counter);
///     manager.execute(QueueKind::Worker, move |_ctx| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     });
/// }
///
/// manager.on_update()?;
/// assert_eq!(counter.load(Ordering::SeqCst), 8);
/// manager.on_release()?;
/// # Ok(())
/// # }
/// ```
pub struct ScheduleManager {
    config: ScheduleConfig,
    pool: ThreadPool,
    worker_queue: Arc<JobQueue>,
    main_queue: Arc<JobQueue>,
    sync_queue: Arc<JobQueue>,
    event_queue: Arc<JobQueue>,
    loader: Loader,
    groups: ThreadGroups,
    events: EventBus,
    tick: AtomicU64,
    tick_lock: Mutex<()>,
    loader_status: Mutex<LoaderStatus>,
    #[cfg(feature = "metrics")]
    metrics: PhaseMetrics,
}

impl std::fmt::Debug for ScheduleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleManager")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("tick", &self.tick_count())
            .field("thread_groups", &self.groups.len())
            .field("loading", &self.loader.is_loading())
            .finish()
    }
}

/// Claims the identity of whichever context pops it, then waits for every other context
struct IdentityClaim {
    barrier: Arc<Barrier>,
    claimed: Arc<Mutex<Vec<ThreadId>>>,
}

impl Job for IdentityClaim {
    fn on_run(&self, ctx: &JobContext) {
        set_current_thread_id(ctx.thread_id());
        self.claimed.lock().push(ctx.thread_id());
        self.barrier.wait();
    }

    fn job_type(&self) -> &str {
        "IdentityClaim"
    }
}

impl ScheduleManager {
    /// Create a manager with the default spawners
    pub fn new(config: ScheduleConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start configuring a manager
    pub fn builder(config: ScheduleConfig) -> ScheduleManagerBuilder {
        ScheduleManagerBuilder {
            config,
            pool_spawner: Arc::new(OsThreadSpawner),
            loader_spawner: Arc::new(OsThreadSpawner),
        }
    }

    /// Start the pool and assign identities.
    ///
    /// The calling thread becomes [`ThreadId::MAIN`]. Every started worker and the main
    /// thread then meet at a barrier, each holding its own identity; the claimed identities
    /// are returned in ascending order.
    pub fn on_pre_init(&self) -> Result<Vec<ThreadId>> {
        set_current_thread_id(ThreadId::MAIN);
        let live = self.pool.init()?;
        let _tick = self.tick_lock.lock();

        let participants = live + 1;
        let barrier = Arc::new(Barrier::new(participants));
        let claimed = Arc::new(Mutex::new(Vec::with_capacity(participants)));
        let rendezvous = Arc::new(JobQueue::new("rendezvous"));
        for _ in 0..participants {
            rendezvous.push(Arc::new(IdentityClaim {
                barrier: Arc::clone(&barrier),
                claimed: Arc::clone(&claimed),
            }));
        }
        rendezvous.flush();

        self.pool.run(&rendezvous)?;
        Worker::run_jobs(&rendezvous, ThreadId::MAIN);
        self.pool.join_all();

        let mut ids = std::mem::take(&mut *claimed.lock());
        ids.sort_unstable();
        log::info!(
            "scheduler ready: {} workers of {} requested, identities {:?}",
            live,
            self.pool.capacity(),
            ids
        );
        Ok(ids)
    }

    /// Run the loader, worker, main and update-group phases of one tick.
    pub fn on_update(&self) -> Result<()> {
        self.ensure_running()?;
        let _tick = self.tick_lock.lock();
        let tick = self.tick.fetch_add(1, Ordering::AcqRel) + 1;

        #[cfg(feature = "tracing")]
        let update_span = tracing::span!(tracing::Level::DEBUG, "on_update", tick = tick);
        #[cfg(feature = "tracing")]
        let _guard = update_span.enter();

        self.run_loader_phase();

        self.events
            .publish(SchedulerEvent::threading_phase(true, tick));
        let result = self.run_pool_phase(Phase::Worker, &self.worker_queue);
        self.events
            .publish(SchedulerEvent::threading_phase(false, tick));
        result?;

        self.run_main_phase(Phase::Main, &self.main_queue);
        self.run_group_phase(GroupPhase::Update)
    }

    /// Run the synchronisation queue and the synchronisation groups.
    pub fn on_synchronise(&self) -> Result<()> {
        self.ensure_running()?;
        let _tick = self.tick_lock.lock();

        self.run_pool_phase(Phase::Synchronise, &self.sync_queue)?;
        self.run_group_phase(GroupPhase::Synchronise)
    }

    /// Drain the event queue on the calling thread.
    pub fn on_process_events(&self) -> Result<()> {
        self.ensure_running()?;
        let _tick = self.tick_lock.lock();

        self.run_main_phase(Phase::Event, &self.event_queue);
        Ok(())
    }

    /// Stop the pool and wait for an in-flight loader batch. Safe to call more than once.
    ///
    /// May be called from a job running on the main thread; the remainder of that tick drains
    /// its flushed batches on the calling thread and then reports [`ThreadError::NotRunning`].
    pub fn on_release(&self) -> Result<()> {
        let result = self.pool.shutdown();
        self.loader.wait();
        result
    }

    /// Stage `job` on one of the fixed queues
    pub fn register_job(&self, job: SharedJob, kind: QueueKind) {
        self.queue(kind).push(job);
    }

    /// Stage a closure on one of the fixed queues, returning the handle that was queued
    pub fn execute<F>(&self, kind: QueueKind, f: F) -> SharedJob
    where
        F: Fn(&JobContext) + Send + Sync + 'static,
    {
        let job: SharedJob = Arc::new(ClosureJob::new(f));
        self.register_job(Arc::clone(&job), kind);
        job
    }

    /// Stage `job` on a thread group
    pub fn register_group_job(&self, job: SharedJob, group: GroupId) -> Result<()> {
        self.groups.push(group, job)
    }

    /// Create a thread group drained during `phase`, after every group created before it
    pub fn add_thread_group(&self, phase: GroupPhase) -> GroupId {
        self.groups.add(phase)
    }

    /// Remove a thread group. Jobs staged on it are dropped without running.
    pub fn remove_thread_group(&self, group: GroupId) -> Result<()> {
        self.groups.remove(group)
    }

    /// Number of thread groups across both phases
    pub fn thread_group_count(&self) -> usize {
        self.groups.len()
    }

    /// Receive scheduler events
    pub fn subscribe(&self) -> Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    /// Whether a background loader batch is running
    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// What the loader phase of the latest tick did
    pub fn last_loader_status(&self) -> LoaderStatus {
        *self.loader_status.lock()
    }

    /// Jobs staged on `kind` and waiting for the next flush
    pub fn staged_jobs(&self, kind: QueueKind) -> usize {
        self.queue(kind).staged_len()
    }

    /// Number of `on_update` calls so far
    pub fn tick_count(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// The underlying pool
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Active configuration
    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Statistics recorded for `phase`
    #[cfg(feature = "metrics")]
    pub fn phase_stats(&self, phase: Phase) -> PhaseStatsSnapshot {
        self.metrics.snapshot(phase)
    }

    fn queue(&self, kind: QueueKind) -> &Arc<JobQueue> {
        match kind {
            QueueKind::Worker => &self.worker_queue,
            QueueKind::Loader => self.loader.queue(),
            QueueKind::Main => &self.main_queue,
            QueueKind::Synchronise => &self.sync_queue,
            QueueKind::Event => &self.event_queue,
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.pool.is_running() {
            Ok(())
        } else {
            Err(ThreadError::not_running(&self.config.thread_name_prefix))
        }
    }

    fn run_loader_phase(&self) {
        let start = Instant::now();
        let status = self.loader.poll();
        let jobs = match status {
            LoaderStatus::Launched(n) | LoaderStatus::RanInline(n) => n,
            LoaderStatus::Idle | LoaderStatus::InFlight => 0,
        };
        self.record(Phase::Loader, jobs, start.elapsed());
        *self.loader_status.lock() = status;
    }

    /// Flush `queue`, drain it on the pool with the calling thread helping, and join.
    ///
    /// A flushed batch is always drained: if the pool refuses the cycle, the calling thread
    /// runs it alone before the error is returned.
    fn run_pool_phase(&self, phase: Phase, queue: &Arc<JobQueue>) -> Result<usize> {
        #[cfg(feature = "tracing")]
        let phase_span = tracing::span!(tracing::Level::DEBUG, "phase", name = phase.name());
        #[cfg(feature = "tracing")]
        let _guard = phase_span.enter();

        let start = Instant::now();
        let size = queue.flush();
        let mut result = Ok(size);
        if size > 0 {
            match self.pool.run(queue) {
                Ok(_) => {
                    Worker::run_jobs(queue, ThreadId::MAIN);
                    self.pool.join_all();
                }
                Err(e) => {
                    log::warn!(
                        "{} phase: {}; draining {} jobs on the calling thread",
                        phase,
                        e,
                        size
                    );
                    Worker::run_jobs(queue, ThreadId::MAIN);
                    result = Err(e);
                }
            }
        }
        self.record(phase, size, start.elapsed());
        result
    }

    /// Flush `queue` and drain it on the calling thread alone
    fn run_main_phase(&self, phase: Phase, queue: &Arc<JobQueue>) -> usize {
        let start = Instant::now();
        let size = queue.flush();
        if size > 0 {
            Worker::run_jobs(queue, ThreadId::MAIN);
        }
        self.record(phase, size, start.elapsed());
        size
    }

    /// Run every group of `phase` in insertion order, joining each before the next.
    ///
    /// Every group is drained even after a failure; the first error is returned.
    fn run_group_phase(&self, phase: GroupPhase) -> Result<()> {
        let metric = match phase {
            GroupPhase::Update => Phase::Groups,
            GroupPhase::Synchronise => Phase::SynchroniseGroups,
        };
        let mut first_error = None;
        for queue in self.groups.queues(phase) {
            if let Err(e) = self.run_pool_phase(metric, &queue) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[allow(unused_variables)]
    fn record(&self, phase: Phase, jobs: usize, elapsed: Duration) {
        #[cfg(feature = "metrics")]
        self.metrics.record(phase, jobs, elapsed);
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_phase(phase.name(), jobs, elapsed);
    }
}

impl Drop for ScheduleManager {
    fn drop(&mut self) {
        if let Err(e) = self.on_release() {
            log::error!("Failed to release scheduler during drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::current_thread_id;
    use std::sync::atomic::AtomicUsize;

    fn manager(threads: usize) -> ScheduleManager {
        let config = ScheduleConfig::new()
            .with_hardware_concurrency(threads + 1)
            .with_max_worker_threads(threads);
        let manager = ScheduleManager::new(config).expect("Failed to create manager");
        manager.on_pre_init().expect("Failed to init manager");
        manager
    }

    #[test]
    fn test_pre_init_assigns_main_identity() {
        let manager = manager(2);
        assert_eq!(current_thread_id(), Some(ThreadId::MAIN));
        assert_eq!(manager.pool().live_workers(), 2);
        manager.on_release().expect("Failed to release");
    }

    #[test]
    fn test_update_requires_pre_init() {
        let manager = ScheduleManager::new(ScheduleConfig::new().with_max_worker_threads(1))
            .expect("Failed to create manager");
        assert!(matches!(
            manager.on_update(),
            Err(ThreadError::NotRunning { .. })
        ));
    }

    #[test]
    fn test_main_queue_runs_on_calling_thread() {
        let manager = manager(2);
        let caller = std::thread::current().id();
        let ran_on_caller = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let ran_on_caller = Arc::clone(&ran_on_caller);
            manager.execute(QueueKind::Main, move |ctx| {
                assert_eq!(ctx.thread_id(), ThreadId::MAIN);
                if std::thread::current().id() == caller {
                    ran_on_caller.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        manager.on_update().expect("update failed");
        assert_eq!(ran_on_caller.load(Ordering::SeqCst), 5);
        manager.on_release().expect("Failed to release");
    }

    #[test]
    fn test_jobs_wait_for_their_phase() {
        let manager = manager(1);
        let sync_runs = Arc::new(AtomicUsize::new(0));
        let event_runs = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&sync_runs);
        manager.execute(QueueKind::Synchronise, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let e = Arc::clone(&event_runs);
        manager.execute(QueueKind::Event, move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        manager.on_update().expect("update failed");
        assert_eq!(sync_runs.load(Ordering::SeqCst), 0);
        assert_eq!(event_runs.load(Ordering::SeqCst), 0);

        manager.on_synchronise().expect("synchronise failed");
        assert_eq!(sync_runs.load(Ordering::SeqCst), 1);
        assert_eq!(event_runs.load(Ordering::SeqCst), 0);

        manager.on_process_events().expect("events failed");
        assert_eq!(event_runs.load(Ordering::SeqCst), 1);
        manager.on_release().expect("Failed to release");
    }

    #[test]
    fn test_threading_phase_events_bracket_worker_phase() {
        let manager = manager(1);
        let events = manager.subscribe();

        manager.on_update().expect("update failed");

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(received.len(), 2);
        match (&received[0], &received[1]) {
            (
                SchedulerEvent::ThreadingPhase {
                    started: true,
                    tick: 1,
                    ..
                },
                SchedulerEvent::ThreadingPhase {
                    started: false,
                    tick: 1,
                    ..
                },
            ) => {}
            other => panic!("unexpected events: {:?}", other),
        }
        manager.on_release().expect("Failed to release");
    }

    #[test]
    fn test_jobs_registered_while_running_wait_for_next_tick() {
        let manager = Arc::new(manager(2));
        let follow_up_runs = Arc::new(AtomicUsize::new(0));

        let inner_manager = Arc::downgrade(&manager);
        let follow_up = Arc::clone(&follow_up_runs);
        manager.execute(QueueKind::Worker, move |_| {
            if let Some(manager) = inner_manager.upgrade() {
                let follow_up = Arc::clone(&follow_up);
                manager.execute(QueueKind::Worker, move |_| {
                    follow_up.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        manager.on_update().expect("first update failed");
        assert_eq!(follow_up_runs.load(Ordering::SeqCst), 0);
        assert_eq!(manager.staged_jobs(QueueKind::Worker), 1);

        manager.on_update().expect("second update failed");
        assert_eq!(follow_up_runs.load(Ordering::SeqCst), 1);
        manager.on_release().expect("Failed to release");
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_phase_stats_count_jobs() {
        let manager = manager(2);
        for _ in 0..4 {
            manager.execute(QueueKind::Worker, |_| {});
        }
        manager.on_update().expect("update failed");
        manager.on_update().expect("update failed");

        let stats = manager.phase_stats(Phase::Worker);
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.jobs, 4);
        assert_eq!(manager.phase_stats(Phase::Main).runs, 2);
        manager.on_release().expect("Failed to release");
    }
}
