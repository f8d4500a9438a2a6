//! Job trait and related types

use crate::core::context::JobContext;
use std::fmt;
use std::sync::Arc;

/// A unit of work driven through a job queue.
///
/// Each time a job is popped it receives `on_start`, `on_run` and `on_finished`, in that order,
/// on the same thread. Queues only hold shared handles, so a job that must mutate state does so
/// through interior mutability and must tolerate being run on any pool thread.
pub trait Job: Send + Sync {
    /// Called before `on_run`
    fn on_start(&self, _ctx: &JobContext) {}

    /// Perform the work
    fn on_run(&self, ctx: &JobContext);

    /// Called after `on_run`, or when the job is discarded without running
    fn on_finished(&self, _ctx: &JobContext) {}

    /// Get the job's type name for debugging and statistics
    fn job_type(&self) -> &str {
        "Job"
    }
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.job_type())
    }
}

/// A shared job handle as stored in queues
pub type SharedJob = Arc<dyn Job>;

/// Helper to create a job from a closure
pub struct ClosureJob<F>
where
    F: Fn(&JobContext) + Send + Sync,
{
    closure: F,
    name: String,
}

impl<F> ClosureJob<F>
where
    F: Fn(&JobContext) + Send + Sync,
{
    /// Create a new closure job
    pub fn new(closure: F) -> Self {
        Self {
            closure,
            name: "ClosureJob".to_string(),
        }
    }

    /// Create a new closure job with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure,
            name: name.into(),
        }
    }
}

impl<F> Job for ClosureJob<F>
where
    F: Fn(&JobContext) + Send + Sync,
{
    fn on_run(&self, ctx: &JobContext) {
        (self.closure)(ctx)
    }

    fn job_type(&self) -> &str {
        &self.name
    }
}
