//! Execution identities and the per-thread identity slot
//!
//! Every execution context the scheduler drives (the main thread, each pool worker and the
//! background loader) carries a small integer identity. Collaborators such as per-thread
//! scratch allocators index their private resources with it.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Identity of an execution context driven by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(u32);

impl ThreadId {
    /// Identity of the thread that drives the tick phases.
    pub const MAIN: ThreadId = ThreadId(0);
    /// Identity of the asynchronous loader task.
    pub const LOADER: ThreadId = ThreadId(u32::MAX - 1);
    /// Identity used when the loader task could not be launched and ran inline.
    pub const FAILED_LOADER: ThreadId = ThreadId(u32::MAX);

    /// Create an identity from its raw value
    pub const fn new(raw: u32) -> Self {
        ThreadId(raw)
    }

    /// Raw identity value
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is one of the loader sentinels
    pub const fn is_loader(self) -> bool {
        self.0 == Self::LOADER.0 || self.0 == Self::FAILED_LOADER.0
    }

    /// Index usable for per-thread resource tables, `None` for loader sentinels
    pub fn as_index(self) -> Option<usize> {
        if self.is_loader() {
            None
        } else {
            Some(self.0 as usize)
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LOADER => write!(f, "loader"),
            Self::FAILED_LOADER => write!(f, "failed-loader"),
            ThreadId(raw) => write!(f, "{}", raw),
        }
    }
}

thread_local! {
    static CURRENT_THREAD_ID: Cell<Option<ThreadId>> = const { Cell::new(None) };
}

/// Identity assigned to the calling thread, if the scheduler has assigned one
pub fn current_thread_id() -> Option<ThreadId> {
    CURRENT_THREAD_ID.with(Cell::get)
}

/// Assign an identity to the calling thread
pub fn set_current_thread_id(id: ThreadId) {
    CURRENT_THREAD_ID.with(|slot| slot.set(Some(id)));
}

/// Context handed to every job callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobContext {
    thread_id: ThreadId,
}

impl JobContext {
    /// Create a context for the given identity
    pub fn new(thread_id: ThreadId) -> Self {
        Self { thread_id }
    }

    /// Context for the calling thread, falling back to the main identity
    pub fn current() -> Self {
        Self::new(current_thread_id().unwrap_or(ThreadId::MAIN))
    }

    /// Identity of the context running the callback
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}
