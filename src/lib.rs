//! # Frame Scheduler
//!
//! A phase-based job scheduler for real-time frame loops: a persistent worker pool, a
//! double-buffered job queue that accepts work while a previous batch drains, and a manager
//! that splits every tick into ordered phases.
//!
//! ## Features
//!
//! - **Persistent Pool**: Threads are created once and parked between cycles
//! - **Double-Buffered Queues**: Producers push while consumers drain the previous flush
//! - **Main Thread Helps**: The calling thread drains pool work alongside the workers
//! - **Thread Groups**: Ordered batches that each fully complete before the next starts
//! - **Background Loader**: One asynchronous batch at a time, run inline if it cannot launch
//! - **Thread Identities**: Every execution context carries a distinct, cheap index
//!
//! ## Quick Start
//!
//! ```rust
//! use frame_scheduler::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let manager = ScheduleManager::new(ScheduleConfig::new().with_max_worker_threads(4))?;
//! let identities = manager.on_pre_init()?;
//! assert_eq!(identities[0], ThreadId::MAIN);
//!
//! manager.execute(QueueKind::Worker, |ctx| {
//!     println!("Simulating on thread {}", ctx.thread_id());
//! });
//! manager.execute(QueueKind::Main, |_| println!("Main thread only"));
//!
//! manager.on_update()?;
//! manager.on_synchronise()?;
//! manager.on_process_events()?;
//!
//! manager.on_release()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Jobs
//!
//! ```rust
//! use frame_scheduler::prelude::*;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct Integrate {
//!     steps: AtomicUsize,
//! }
//!
//! impl Job for Integrate {
//!     fn on_run(&self, _ctx: &JobContext) {
//!         self.steps.fetch_add(1, Ordering::Relaxed);
//!     }
//!
//!     fn job_type(&self) -> &str {
//!         "Integrate"
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! # let manager = ScheduleManager::new(ScheduleConfig::new().with_max_worker_threads(2))?;
//! # manager.on_pre_init()?;
//! let job = Arc::new(Integrate { steps: AtomicUsize::new(0) });
//! manager.register_job(job.clone(), QueueKind::Worker);
//! manager.on_update()?;
//! assert_eq!(job.steps.load(Ordering::Relaxed), 1);
//! # manager.on_release()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Groups
//!
//! ```rust
//! use frame_scheduler::prelude::*;
//!
//! # fn main() -> Result<()> {
//! # let manager = ScheduleManager::new(ScheduleConfig::new().with_max_worker_threads(2))?;
//! # manager.on_pre_init()?;
//! let broadphase = manager.add_thread_group(GroupPhase::Update);
//! let narrowphase = manager.add_thread_group(GroupPhase::Update);
//!
//! // Every broadphase job completes before any narrowphase job starts
//! manager.register_group_job(std::sync::Arc::new(ClosureJob::new(|_: &JobContext| {})), broadphase)?;
//! manager.register_group_job(std::sync::Arc::new(ClosureJob::new(|_: &JobContext| {})), narrowphase)?;
//! manager.on_update()?;
//! # manager.on_release()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub mod queue;
pub mod schedule;
pub mod tracing;

pub use core::{
    current_thread_id, set_current_thread_id, Barrier, ClosureJob, Job, JobContext, Result,
    SharedJob, ThreadError, ThreadId,
};
pub use pool::{ThreadPool, ThreadPoolConfig, Worker, WorkerStats};
pub use queue::{JobQueue, QueueKind};
pub use schedule::{GroupId, GroupPhase, Phase, ScheduleConfig, ScheduleManager, SchedulerEvent};
