//! Thread pool implementation

use crate::core::{Result, ThreadError, ThreadId};
use crate::pool::spawner::{OsThreadSpawner, ThreadSpawner};
use crate::pool::worker::{PoolShared, Worker, WorkerStats};
use crate::queue::JobQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Default upper bound on pool threads
pub const DEFAULT_MAX_WORKER_THREADS: usize = 16;

/// Pool capacity for the given hardware concurrency.
///
/// One logical core is left for the main thread: `min(max(hardware, 2) - 1, max_threads)`.
pub fn worker_capacity(hardware_concurrency: usize, max_threads: usize) -> usize {
    (hardware_concurrency.max(2) - 1).min(max_threads)
}

/// Configuration for thread pool
#[derive(Clone)]
pub struct ThreadPoolConfig {
    /// Number of pooled threads
    pub capacity: usize,
    /// Identity of the first pooled thread; the rest follow sequentially
    pub id_offset: u32,
    /// Thread name prefix
    pub thread_name_prefix: String,
    spawner: Arc<dyn ThreadSpawner>,
}

impl std::fmt::Debug for ThreadPoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolConfig")
            .field("capacity", &self.capacity)
            .field("id_offset", &self.id_offset)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .finish()
    }
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            capacity: worker_capacity(num_cpus::get(), DEFAULT_MAX_WORKER_THREADS),
            id_offset: 1,
            thread_name_prefix: "worker".to_string(),
            spawner: Arc::new(OsThreadSpawner),
        }
    }
}

impl ThreadPoolConfig {
    /// Create a new configuration with the specified number of pooled threads
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the identity of the first pooled thread
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_id_offset(mut self, offset: u32) -> Self {
        self.id_offset = offset;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the spawner used to create pooled threads
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_spawner(mut self, spawner: Arc<dyn ThreadSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ThreadError::invalid_config(
                "capacity",
                "Number of threads must be greater than 0",
            ));
        }
        let last = u64::from(self.id_offset) + self.capacity as u64 - 1;
        if last >= u64::from(ThreadId::LOADER.get()) {
            return Err(ThreadError::invalid_config(
                "id_offset",
                "Worker identities would collide with the loader sentinels",
            ));
        }
        Ok(())
    }
}

/// A fixed set of persistent threads that drain whichever queue is hooked in.
///
/// # Cycles
///
/// Work is handed over in cycles: [`run`](ThreadPool::run) hooks a flushed queue and wakes
/// every worker, [`join_all`](ThreadPool::join_all) blocks until they all report idle. A new
/// cycle cannot start until the previous one was joined.
///
/// # Shutdown
///
/// Threads are created once by [`init`](ThreadPool::init) and torn down once by
/// [`shutdown`](ThreadPool::shutdown) or on drop.
pub struct ThreadPool {
    config: ThreadPoolConfig,
    shared: Arc<PoolShared>,
    workers: Vec<Arc<Worker>>,
    threads: Mutex<Vec<(ThreadId, JoinHandle<()>)>>,
    running: AtomicBool,
    stopped: AtomicBool,
    cycle_open: AtomicBool,
    last_queue_size: AtomicUsize,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.config)
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("live_workers", &self.live_workers())
            .field("last_queue_size", &self.last_queue_size())
            .finish()
    }
}

impl ThreadPool {
    /// Create a pool with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ThreadPoolConfig::default())
    }

    /// Create a pool with the specified number of threads
    pub fn with_threads(capacity: usize) -> Result<Self> {
        Self::with_config(ThreadPoolConfig::new(capacity))
    }

    /// Create a pool with custom configuration. No thread is started until [`init`](Self::init).
    pub fn with_config(config: ThreadPoolConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(PoolShared::default());
        let workers = (0..config.capacity)
            .map(|index| {
                let id = ThreadId::new(config.id_offset + index as u32);
                Arc::new(Worker::new(id, Arc::clone(&shared)))
            })
            .collect();

        Ok(Self {
            config,
            shared,
            workers,
            threads: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            cycle_open: AtomicBool::new(false),
            last_queue_size: AtomicUsize::new(0),
        })
    }

    /// Spawn one thread per worker slot.
    ///
    /// A slot whose thread cannot be created is logged and left idle. Returns the number of
    /// threads actually started.
    pub fn init(&self) -> Result<usize> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(ThreadError::other(format!(
                "Thread pool '{}' was shut down and cannot be restarted",
                self.config.thread_name_prefix
            )));
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ThreadError::already_running(
                &self.config.thread_name_prefix,
                self.config.capacity,
            ));
        }

        let mut threads = self.threads.lock();
        for worker in &self.workers {
            let id = worker.thread_id();
            let name = format!("{}-{}", self.config.thread_name_prefix, id);
            let task_worker = Arc::clone(worker);

            match self
                .config
                .spawner
                .spawn(name, Box::new(move || task_worker.on_pooled_run()))
            {
                Ok(handle) => {
                    worker.mark_spawned();
                    threads.push((id, handle));
                }
                Err(e) => {
                    let err = ThreadError::spawn_with_source(
                        id.get(),
                        "slot left idle",
                        e,
                    );
                    log::warn!("{}", err);
                }
            }
        }

        let live = threads.len();
        log::info!(
            "thread pool '{}' started {}/{} workers",
            self.config.thread_name_prefix,
            live,
            self.config.capacity
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_start(live, self.config.capacity);

        Ok(live)
    }

    /// Hook `queue` and wake every live worker to drain it.
    ///
    /// Does nothing and returns `Ok(false)` when the run sequence is empty. Each successful
    /// activation must be paired with one [`join_all`](Self::join_all) before the next `run`.
    pub fn run(&self, queue: &Arc<JobQueue>) -> Result<bool> {
        if !self.running.load(Ordering::Acquire) {
            return Err(ThreadError::not_running(&self.config.thread_name_prefix));
        }
        if self
            .cycle_open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ThreadError::cycle_in_progress(queue.label()));
        }

        let size = queue.size();
        self.last_queue_size.store(size, Ordering::Release);
        if size == 0 {
            self.cycle_open.store(false, Ordering::Release);
            return Ok(false);
        }

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_cycle_start(queue.label(), size);

        *self.shared.hook.write() = Some(Arc::clone(queue));
        {
            let _guard = self.shared.notify_lock.lock();
            for worker in self.workers.iter().filter(|w| w.is_spawned()) {
                worker.activate();
            }
        }
        self.shared.notify.notify_all();
        Ok(true)
    }

    /// Block until every worker activated by the last [`run`](Self::run) reports idle.
    ///
    /// Returns immediately when the last `run` submitted no work.
    pub fn join_all(&self) {
        if !self.cycle_open.load(Ordering::Acquire) {
            return;
        }

        {
            let mut guard = self.shared.response_lock.lock();
            self.shared
                .response
                .wait_while(&mut guard, |_| self.workers.iter().any(|w| w.is_running()));
        }

        *self.shared.hook.write() = None;
        self.cycle_open.store(false, Ordering::Release);
    }

    /// Whether any worker is still draining
    pub fn is_busy(&self) -> bool {
        self.workers.iter().any(|w| w.is_running())
    }

    /// Run-sequence size seen by the last [`run`](Self::run)
    pub fn last_queue_size(&self) -> usize {
        self.last_queue_size.load(Ordering::Acquire)
    }

    /// Number of worker slots
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of workers whose thread was started
    pub fn live_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.is_spawned()).count()
    }

    /// Identities of the workers whose thread was started
    pub fn worker_ids(&self) -> Vec<ThreadId> {
        self.workers
            .iter()
            .filter(|w| w.is_spawned())
            .map(|w| w.thread_id())
            .collect()
    }

    /// Check if the pool is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get statistics for all workers
    pub fn get_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.workers.iter().map(|w| w.stats()).collect()
    }

    /// Get total jobs processed across all workers
    pub fn total_jobs_processed(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.stats().get_jobs_processed())
            .sum()
    }

    /// Get total jobs panicked across all workers
    pub fn total_jobs_panicked(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.stats().get_jobs_panicked())
            .sum()
    }

    /// Terminate every worker and join its thread.
    ///
    /// Safe to call more than once; only the first call does any work.
    pub fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.stopped.store(true, Ordering::Release);

        *self.shared.hook.write() = None;
        {
            let _guard = self.shared.notify_lock.lock();
            for worker in &self.workers {
                worker.terminate();
            }
        }
        self.shared.notify.notify_all();

        let threads = std::mem::take(&mut *self.threads.lock());
        let mut first_error = None;
        for (id, handle) in threads {
            if handle.join().is_err() {
                let err = ThreadError::join(id.get(), "Worker panicked");
                log::error!("{}", err);
                first_error.get_or_insert(err);
            }
        }
        self.cycle_open.store(false, Ordering::Release);

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_shutdown(
            self.total_jobs_processed(),
            self.total_jobs_panicked(),
        );
        log::info!(
            "thread pool '{}' shut down",
            self.config.thread_name_prefix
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if self.running.load(Ordering::Acquire) {
            if let Err(e) = self.shutdown() {
                log::error!(
                    "Failed to shutdown thread pool '{}' during drop: {}",
                    self.config.thread_name_prefix,
                    e
                );
            }
        }
    }
}
