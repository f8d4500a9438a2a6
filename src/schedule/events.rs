//! Scheduler notifications for external observers

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;

/// Notification posted by the scheduler
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SchedulerEvent {
    /// Posted right before (`started == true`) and right after the worker phase
    ThreadingPhase {
        /// Whether pooled work is starting or has finished
        started: bool,
        /// Tick the phase belongs to
        tick: u64,
        /// When the event was posted
        timestamp: DateTime<Utc>,
    },
}

impl SchedulerEvent {
    /// Threading phase event stamped with the current time
    pub fn threading_phase(started: bool, tick: u64) -> Self {
        SchedulerEvent::ThreadingPhase {
            started,
            tick,
            timestamp: Utc::now(),
        }
    }
}

/// Fan-out of scheduler events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<SchedulerEvent>>>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event posted from now on
    pub fn subscribe(&self) -> Receiver<SchedulerEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber; dropped receivers are forgotten
    pub fn publish(&self, event: SchedulerEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last publish
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
