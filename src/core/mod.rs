//! Core types and traits for the scheduler

pub mod barrier;
pub mod context;
pub mod error;
pub mod job;

pub use barrier::Barrier;
pub use context::{current_thread_id, set_current_thread_id, JobContext, ThreadId};
pub use error::{Result, ThreadError};
pub use job::{ClosureJob, Job, SharedJob};
