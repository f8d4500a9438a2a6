//! Job queues and the fixed queue kinds the scheduler drives.
//!
//! A job's "type" is the queue it is submitted to:
//!
//! - [`QueueKind::Worker`]: drained by the pool with the main thread helping
//! - [`QueueKind::Loader`]: drained by the background loader task
//! - [`QueueKind::Main`]: drained on the main thread only
//! - [`QueueKind::Synchronise`]: drained by the pool during the synchronise step
//! - [`QueueKind::Event`]: drained on the main thread during event processing

mod job_queue;

pub use job_queue::JobQueue;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed queues owned by the scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    /// Pool work during the update step
    Worker,
    /// Background loading work
    Loader,
    /// Main-thread-only work during the update step
    Main,
    /// Pool work during the synchronise step
    Synchronise,
    /// Main-thread-only work during event processing
    Event,
}

impl QueueKind {
    /// Every queue kind, in phase order
    pub const ALL: [QueueKind; 5] = [
        QueueKind::Loader,
        QueueKind::Worker,
        QueueKind::Main,
        QueueKind::Synchronise,
        QueueKind::Event,
    ];

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        match self {
            QueueKind::Worker => "worker",
            QueueKind::Loader => "loader",
            QueueKind::Main => "main",
            QueueKind::Synchronise => "synchronise",
            QueueKind::Event => "event",
        }
    }

    /// Whether the queue is handed to the worker pool
    pub fn runs_on_pool(self) -> bool {
        matches!(self, QueueKind::Worker | QueueKind::Synchronise)
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
