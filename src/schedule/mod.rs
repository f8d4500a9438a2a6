//! Phase-based tick scheduling.
//!
//! A tick is split into ordered phases:
//!
//! | Step                  | Phase                | Runs on                         |
//! |-----------------------|----------------------|---------------------------------|
//! | `on_update`           | loader               | background thread (one batch)   |
//! | `on_update`           | worker               | pool + main thread, joined      |
//! | `on_update`           | main                 | main thread                     |
//! | `on_update`           | groups               | pool + main thread, one by one  |
//! | `on_synchronise`      | synchronise + groups | pool + main thread, joined      |
//! | `on_process_events`   | event                | main thread                     |

mod config;
mod events;
mod groups;
mod loader;
mod manager;
#[cfg(feature = "metrics")]
mod metrics;
mod phase;

pub use config::ScheduleConfig;
pub use events::{EventBus, SchedulerEvent};
pub use groups::{GroupId, GroupPhase};
pub use loader::LoaderStatus;
pub use manager::{ScheduleManager, ScheduleManagerBuilder};
#[cfg(feature = "metrics")]
pub use metrics::{PhaseMetrics, PhaseStatsSnapshot};
pub use phase::Phase;
