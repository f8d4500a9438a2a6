//! Tick phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Reap and launch background loading
    Loader,
    /// Worker queue on the pool, main thread helping
    Worker,
    /// Main-thread-only queue
    Main,
    /// Update thread groups, one after another
    Groups,
    /// Synchronisation queue on the pool, main thread helping
    Synchronise,
    /// Synchronisation thread groups, one after another
    SynchroniseGroups,
    /// Event queue on the main thread
    Event,
}

impl Phase {
    /// Every phase, in the order a full tick walks them
    pub const ALL: [Phase; 7] = [
        Phase::Loader,
        Phase::Worker,
        Phase::Main,
        Phase::Groups,
        Phase::Synchronise,
        Phase::SynchroniseGroups,
        Phase::Event,
    ];

    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Phase::Loader => "loader",
            Phase::Worker => "worker",
            Phase::Main => "main",
            Phase::Groups => "groups",
            Phase::Synchronise => "synchronise",
            Phase::SynchroniseGroups => "synchronise_groups",
            Phase::Event => "event",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
