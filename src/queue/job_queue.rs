//! Double-buffered job queue
//!
//! Producers append to a staging buffer at any time. Consumers drain a separate run
//! sequence that only changes on [`JobQueue::flush`]. The two buffers sit behind
//! independent locks, so pushing never contends with a drain in progress.

use crate::core::error::panic_message;
use crate::core::{JobContext, SharedJob};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// FIFO of shared job handles with separate staging and run buffers.
pub struct JobQueue {
    label: String,
    staging: Mutex<Vec<SharedJob>>,
    running: Mutex<VecDeque<SharedJob>>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("label", &self.label)
            .field("staged", &self.staged_len())
            .field("size", &self.size())
            .finish()
    }
}

impl JobQueue {
    /// Create an empty queue
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            staging: Mutex::new(Vec::new()),
            running: Mutex::new(VecDeque::new()),
        }
    }

    /// Name used in logs and errors
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stage a job for the next flush. Safe to call while the run sequence is being drained.
    pub fn push(&self, job: SharedJob) {
        self.staging.lock().push(job);
    }

    /// Promote every staged job into the run sequence, in push order.
    ///
    /// Jobs left over in the run sequence from an undrained cycle are discarded; each of them
    /// receives `on_finished` so that start/finish bookkeeping stays balanced.
    ///
    /// Returns the size of the new run sequence.
    pub fn flush(&self) -> usize {
        let mut running = self.running.lock();
        let staged = std::mem::take(&mut *self.staging.lock());
        let leftover = std::mem::replace(&mut *running, VecDeque::from(staged));
        let size = running.len();
        drop(running);

        if !leftover.is_empty() {
            log::warn!(
                "queue '{}' flushed with {} unstarted jobs; finishing them unrun",
                self.label,
                leftover.len()
            );
            self.finish_unstarted(leftover);
        }
        size
    }

    /// Next job of the run sequence, or `None` once it is exhausted
    pub fn pop(&self) -> Option<SharedJob> {
        self.running.lock().pop_front()
    }

    /// Snapshot of the number of jobs left in the run sequence
    pub fn size(&self) -> usize {
        self.running.lock().len()
    }

    /// Whether the run sequence is empty
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of jobs waiting for the next flush
    pub fn staged_len(&self) -> usize {
        self.staging.lock().len()
    }

    fn finish_unstarted(&self, jobs: impl IntoIterator<Item = SharedJob>) {
        let ctx = JobContext::current();
        for job in jobs {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job.on_finished(&ctx))) {
                log::error!(
                    "queue '{}': job {} panicked while finishing unrun: {}",
                    self.label,
                    job.job_type(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        let remaining = std::mem::take(self.running.get_mut());
        if !remaining.is_empty() {
            log::debug!(
                "queue '{}' dropped with {} unstarted jobs",
                self.label,
                remaining.len()
            );
            self.finish_unstarted(remaining);
        }
    }
}
