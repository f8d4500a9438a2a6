//! Thread creation seam shared by the pool and the background loader

use std::io;
use std::thread::{self, JoinHandle};

/// A task handed to a [`ThreadSpawner`]
pub type SpawnTask = Box<dyn FnOnce() + Send + 'static>;

/// Creates the OS threads the scheduler runs on.
///
/// A failed spawn is not fatal: the pool leaves that slot idle and the loader runs its batch
/// inline instead.
pub trait ThreadSpawner: Send + Sync {
    /// Start `task` on a new thread called `name`
    fn spawn(&self, name: String, task: SpawnTask) -> io::Result<JoinHandle<()>>;
}

/// Spawns named threads through [`std::thread::Builder`]
#[derive(Debug, Default, Clone, Copy)]
pub struct OsThreadSpawner;

impl ThreadSpawner for OsThreadSpawner {
    fn spawn(&self, name: String, task: SpawnTask) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name(name).spawn(task)
    }
}
