//! Thread pool and worker implementations

pub mod spawner;
pub mod thread_pool;
pub mod worker;

pub use spawner::{OsThreadSpawner, SpawnTask, ThreadSpawner};
pub use thread_pool::{worker_capacity, ThreadPool, ThreadPoolConfig, DEFAULT_MAX_WORKER_THREADS};
pub use worker::{Worker, WorkerStats};
