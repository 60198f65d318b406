//! Delivery thread body

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::delivery::deliverer::{Deliverer, Disposition, Releaser};
use crate::delivery::DeliveryState;
use crate::error::{RegulatorError, Result};
use crate::instance::Core;
use crate::pacing::{PeriodOutcome, PeriodTimer};

/// Spawn the delivery thread for `core`
pub(crate) fn spawn(
    core: Arc<Core>,
    deliverer: Box<dyn Deliverer>,
) -> Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name("regulator-delivery".into());
    if core.config.delivery_stack_size > 0 {
        builder = builder.stack_size(core.config.delivery_stack_size);
    }

    builder
        .spawn(move || run(core, deliverer))
        .map_err(|_| RegulatorError::too_many("delivery thread"))
}

/// Opens the exit gate however the thread ends, including a panicking
/// deliverer, so `delete` never waits on a thread that is already gone.
struct ExitGuard<'a> {
    core: &'a Core,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if self.core.delivery_state() == DeliveryState::Running {
            self.core.set_delivery_state(DeliveryState::Stopped);
        }
        self.core.exited.open();
    }
}

fn run(core: Arc<Core>, mut deliverer: Box<dyn Deliverer>) {
    let _exit = ExitGuard { core: &core };

    apply_priority(core.config.delivery_priority);

    // The pacing timer belongs to this thread; `create` has already
    // returned by the time this runs, so a failure here is only visible
    // through the instance's delivery state.
    let mut timer = match PeriodTimer::new(core.config.delivery_period) {
        Ok(timer) => timer,
        Err(err) => {
            log::warn!("delivery pacing disabled: {}", err);
            core.set_delivery_state(DeliveryState::Failed);
            return;
        }
    };

    core.set_delivery_state(DeliveryState::Running);

    loop {
        match timer.wait(&core.shutdown) {
            PeriodOutcome::Interrupted => break,
            outcome => {
                core.stats
                    .record_period(outcome == PeriodOutcome::Missed);
                drain(&core, deliverer.as_mut());
            }
        }
    }
}

/// Drain at most `max_dequeue_per_period` messages, stopping early on an
/// empty queue. Never waits for more work within a period.
fn drain(core: &Core, deliverer: &mut dyn Deliverer) {
    let releaser = Releaser::new(core);

    for _ in 0..core.config.max_dequeue_per_period {
        let Some(entry) = core.queue.try_dequeue() else {
            break;
        };

        match deliverer.deliver(&releaser, entry.buffer, entry.length) {
            Disposition::ReleaseNow(buffer) => core.release(buffer),
            Disposition::AlreadyReleased => {}
        }

        // Counted after the release accounting, so a statistics snapshot
        // never observes delivered > released.
        core.stats.record_delivered();
    }
}

/// Best-effort priority application for the calling thread.
///
/// Lower regulator priorities are more urgent; they map onto non-negative
/// niceness so no privilege is required. `who == 0` targets the calling
/// thread on Linux.
#[cfg(target_os = "linux")]
fn apply_priority(priority: u32) {
    use nix::libc;

    let nice = priority.saturating_sub(1).min(19) as libc::c_int;
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, 0, nice) };
    if rc != 0 {
        log::warn!("could not set delivery thread niceness to {}", nice);
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_priority(_priority: u32) {}
