//! Background loader: one asynchronous batch in flight at a time

use crate::core::{current_thread_id, set_current_thread_id, ThreadId};
use crate::pool::{ThreadSpawner, Worker};
use crate::queue::JobQueue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Outcome of one loader phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderStatus {
    /// Nothing was staged
    Idle,
    /// The previous batch is still running; nothing new was launched
    InFlight,
    /// A batch of this many jobs was launched in the background
    Launched(usize),
    /// The launch failed and this many jobs ran inline under the failed-loader identity
    RanInline(usize),
}

pub(crate) struct Loader {
    queue: Arc<JobQueue>,
    spawner: Arc<dyn ThreadSpawner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Loader {
    pub(crate) fn new(spawner: Arc<dyn ThreadSpawner>) -> Self {
        Self {
            queue: Arc::new(JobQueue::new("loader")),
            spawner,
            task: Mutex::new(None),
        }
    }

    pub(crate) fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Reap a finished batch, then launch the next one if jobs are staged
    pub(crate) fn poll(&self) -> LoaderStatus {
        let mut task = self.task.lock();
        if let Some(handle) = task.take() {
            if !handle.is_finished() {
                *task = Some(handle);
                return LoaderStatus::InFlight;
            }
            if handle.join().is_err() {
                log::error!("loader task panicked");
            }
        }

        let size = self.queue.flush();
        if size == 0 {
            return LoaderStatus::Idle;
        }

        let queue = Arc::clone(&self.queue);
        let launch = self.spawner.spawn(
            "loader".to_string(),
            Box::new(move || {
                Worker::run_jobs(&queue, ThreadId::LOADER);
            }),
        );

        match launch {
            Ok(handle) => {
                *task = Some(handle);
                log::debug!("loader launched with {} jobs", size);
                LoaderStatus::Launched(size)
            }
            Err(e) => {
                drop(task);
                log::warn!("failed to launch loader task ({}); running {} jobs inline", e, size);
                let previous = current_thread_id();
                let executed = Worker::run_jobs(&self.queue, ThreadId::FAILED_LOADER);
                if let Some(id) = previous {
                    set_current_thread_id(id);
                }
                LoaderStatus::RanInline(executed)
            }
        }
    }

    /// Block until the in-flight batch, if any, has finished
    pub(crate) fn wait(&self) {
        if let Some(handle) = self.task.lock().take() {
            if handle.join().is_err() {
                log::error!("loader task panicked");
            }
        }
    }
}
