//! Monotonic-clock period pacing with deadline-miss detection

use std::time::{Duration, Instant};

use crate::error::{RegulatorError, Result};
use crate::sync::Gate;

/// How a period boundary was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PeriodOutcome {
    /// Woke at the deadline
    OnTime,
    /// The deadline had already passed when the wait started
    Missed,
    /// The shutdown gate opened before the deadline
    Interrupted,
}

/// Fixed-interval deadline tracker for the delivery thread.
///
/// The first call to [`wait`](Self::wait) initiates the period and returns
/// immediately; each later call sleeps until the next deadline on the
/// monotonic clock. Deadlines advance by whole intervals from the initial
/// anchor, so servicing jitter does not accumulate.
#[derive(Debug)]
pub(crate) struct PeriodTimer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl PeriodTimer {
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(RegulatorError::invalid_number("delivery_period"));
        }
        Ok(Self {
            interval,
            deadline: None,
        })
    }

    /// Block until the next period boundary or until `shutdown` opens.
    pub fn wait(&mut self, shutdown: &Gate) -> PeriodOutcome {
        if shutdown.is_open() {
            return PeriodOutcome::Interrupted;
        }

        let deadline = match self.deadline {
            None => {
                // First execution initiates the period.
                self.deadline = Some(Instant::now() + self.interval);
                return PeriodOutcome::OnTime;
            }
            Some(deadline) => deadline,
        };

        let now = Instant::now();
        if now >= deadline {
            self.resync(now);
            return PeriodOutcome::Missed;
        }

        if shutdown.wait_deadline(deadline) {
            return PeriodOutcome::Interrupted;
        }

        self.deadline = Some(deadline + self.interval);
        PeriodOutcome::OnTime
    }

    /// Advance the deadline past `now` by whole intervals.
    fn resync(&mut self, now: Instant) {
        let mut deadline = self.deadline.expect("resync before first wait");
        while deadline <= now {
            deadline += self.interval;
        }
        self.deadline = Some(deadline);
    }
}
