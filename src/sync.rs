//! Internal signalling primitives for delivery thread coordination

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// One-shot latch: starts closed, opens exactly once, wakes all waiters.
///
/// Used in two places: the shutdown signal that interrupts the delivery
/// thread's inter-period sleep, and the exit signal the delivery thread
/// raises so `delete` can wait for it with a timeout.
#[derive(Debug)]
pub(crate) struct Gate {
    opened: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            opened: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Open the gate and wake every waiter. Idempotent.
    pub fn open(&self) {
        let mut opened = self.opened.lock().unwrap();
        *opened = true;
        self.cv.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *self.opened.lock().unwrap()
    }

    /// Block until the gate opens or `deadline` passes.
    ///
    /// Returns `true` if the gate was open when the wait ended.
    pub fn wait_deadline(&self, deadline: Instant) -> bool {
        let mut opened = self.opened.lock().unwrap();
        loop {
            if *opened {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.cv.wait_timeout(opened, deadline - now).unwrap();
            opened = guard;
        }
    }

    /// Block until the gate opens or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400));
        self.wait_deadline(deadline)
    }
}
