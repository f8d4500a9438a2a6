//! One-shot rendezvous for a known number of participants

use parking_lot::{Condvar, Mutex};

/// Blocks callers of [`Barrier::wait`] until `participants` of them have arrived.
///
/// The barrier is single use. Once the count reaches zero every later `wait` returns
/// immediately.
#[derive(Debug)]
pub struct Barrier {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl Barrier {
    /// Create a barrier for exactly `participants` arrivals
    pub fn new(participants: usize) -> Self {
        Self {
            remaining: Mutex::new(participants),
            released: Condvar::new(),
        }
    }

    /// Arrive and block until every participant has arrived.
    ///
    /// Returns `true` for the participant whose arrival released the others.
    pub fn wait(&self) -> bool {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return false;
        }

        *remaining -= 1;
        if *remaining == 0 {
            self.released.notify_all();
            return true;
        }

        self.released.wait_while(&mut remaining, |left| *left > 0);
        false
    }

    /// Participants that have not arrived yet
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}
