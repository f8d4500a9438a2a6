//! Convenient re-exports for common types and traits

pub use crate::core::{
    current_thread_id, set_current_thread_id, ClosureJob, Job, JobContext, Result, SharedJob,
    ThreadError, ThreadId,
};
pub use crate::pool::{ThreadPool, ThreadPoolConfig, WorkerStats};
pub use crate::queue::{JobQueue, QueueKind};
pub use crate::schedule::{
    GroupId, GroupPhase, LoaderStatus, Phase, ScheduleConfig, ScheduleManager, SchedulerEvent,
};
