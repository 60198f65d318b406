//! Regulator instance: creation, lifecycle, and the producer-facing API

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::RegulatorConfig;
use crate::delivery::{self, Deliverer, DeliveryState};
use crate::error::{RegulatorError, Result};
use crate::pool::{MessageBuffer, SlotArena};
use crate::queue::{QueuedMessage, SubmissionQueue};
use crate::stats::{AtomicRegulatorStats, RegulatorStatistics};
use crate::sync::Gate;

/// State shared between the producer-facing API and the delivery thread
pub(crate) struct Core {
    pub(crate) config: RegulatorConfig,
    pub(crate) arena: Arc<SlotArena>,
    pub(crate) queue: SubmissionQueue,
    pub(crate) stats: AtomicRegulatorStats,
    /// Opened by `delete`/`Drop` to interrupt the inter-period sleep
    pub(crate) shutdown: Gate,
    /// Opened by the delivery thread when it exits, however it exits
    pub(crate) exited: Gate,
    delivery_state: AtomicU8,
}

impl Core {
    /// Return a buffer to the pool and account for it.
    ///
    /// The single release path: producers, the delivery thread, and
    /// deliverers (via [`Releaser`](crate::Releaser)) all come through
    /// here, so `released` exactly counts slots returned to the free list.
    pub(crate) fn release(&self, buffer: MessageBuffer) {
        self.arena.put_back(buffer);
        self.stats.record_released();
    }

    pub(crate) fn delivery_state(&self) -> DeliveryState {
        DeliveryState::from_u8(self.delivery_state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_delivery_state(&self, state: DeliveryState) {
        self.delivery_state.store(state as u8, Ordering::SeqCst);
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("config", &self.config)
            .field("queued", &self.queue.len())
            .field("delivery_state", &self.delivery_state())
            .finish()
    }
}

/// A rejected `send`: the error plus the buffer, handed back so the caller
/// keeps ownership and can retry or release.
#[derive(Debug)]
pub struct SendRejected {
    pub error: RegulatorError,
    pub buffer: MessageBuffer,
}

impl SendRejected {
    fn new(error: RegulatorError, buffer: MessageBuffer) -> Self {
        Self { error, buffer }
    }
}

impl fmt::Display for SendRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send rejected: {}", self.error)
    }
}

impl std::error::Error for SendRejected {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Admission-controlled, rate-paced message funnel.
///
/// Binds a fixed buffer pool, a bounded FIFO, and one periodic delivery
/// thread. Producers obtain a buffer, fill it, and send it; the delivery
/// thread drains at most `max_dequeue_per_period` messages per
/// `delivery_period` and hands each to the configured [`Deliverer`], which
/// bounds the sustained delivery rate no matter how bursty the producers
/// are.
#[derive(Debug)]
pub struct Regulator {
    core: Arc<Core>,
    thread: Mutex<Option<JoinHandle<()>>>,
    deleted: AtomicBool,
}

impl Regulator {
    /// Create an instance and start its delivery thread.
    ///
    /// The whole configuration is validated before anything is allocated;
    /// a failure part-way through creation drops everything acquired so
    /// far, so no partial instance ever survives. Note that the delivery
    /// thread creates its own pacing timer asynchronously: a timer
    /// creation failure is not reported here, only through
    /// [`delivery_state`](Self::delivery_state).
    pub fn create<D: Deliverer>(config: RegulatorConfig, deliverer: D) -> Result<Self> {
        config.validate()?;

        let arena = SlotArena::new(config.max_messages, config.max_message_size)?;
        let queue = SubmissionQueue::new(config.max_messages)?;

        let core = Arc::new(Core {
            config,
            arena,
            queue,
            stats: AtomicRegulatorStats::new(),
            shutdown: Gate::new(),
            exited: Gate::new(),
            delivery_state: AtomicU8::new(DeliveryState::Initializing as u8),
        });

        let handle = delivery::spawn(Arc::clone(&core), Box::new(deliverer))?;

        Ok(Self {
            core,
            thread: Mutex::new(Some(handle)),
            deleted: AtomicBool::new(false),
        })
    }

    /// Take a buffer from the pool, non-blocking.
    ///
    /// `Exhausted` once all `max_messages` buffers are outstanding; that is
    /// backpressure, and the producer decides whether to retry or drop.
    pub fn obtain_buffer(&self) -> Result<MessageBuffer> {
        self.ensure_live()?;

        match self.core.arena.try_take() {
            Some(buffer) => {
                self.core.stats.record_obtained();
                Ok(buffer)
            }
            None => Err(RegulatorError::exhausted(self.core.config.max_messages)),
        }
    }

    /// Return an unsent buffer to the pool
    pub fn release_buffer(&self, buffer: MessageBuffer) -> Result<()> {
        self.ensure_live()?;
        self.core.release(buffer);
        Ok(())
    }

    /// Queue `length` bytes of `buffer` for paced delivery.
    ///
    /// Non-blocking; ownership of the buffer moves into the queue. On any
    /// rejection the buffer comes back inside the error.
    pub fn send(
        &self,
        buffer: MessageBuffer,
        length: usize,
    ) -> std::result::Result<(), SendRejected> {
        if length == 0 {
            return Err(SendRejected::new(
                RegulatorError::invalid_number("length"),
                buffer,
            ));
        }
        if length > buffer.capacity() {
            return Err(SendRejected::new(
                RegulatorError::invalid_size("length"),
                buffer,
            ));
        }
        if self.deleted.load(Ordering::SeqCst) {
            return Err(SendRejected::new(RegulatorError::IncorrectState, buffer));
        }

        let capacity = self.core.queue.capacity();
        match self.core.queue.try_enqueue(QueuedMessage { buffer, length }) {
            Ok(()) => Ok(()),
            Err(rejected) => Err(SendRejected::new(
                RegulatorError::queue_full(capacity),
                rejected.buffer,
            )),
        }
    }

    /// Consistent snapshot of the running counters
    pub fn statistics(&self) -> Result<RegulatorStatistics> {
        self.ensure_live()?;
        Ok(self.core.stats.snapshot())
    }

    /// Current state of the delivery thread
    pub fn delivery_state(&self) -> DeliveryState {
        self.core.delivery_state()
    }

    /// Stop the delivery thread and retire the instance.
    ///
    /// Fails fast with `ResourceInUse` while any buffer is outstanding;
    /// this is a precondition check, not a drain. Otherwise the delivery
    /// thread is woken immediately and given `timeout` to quiesce. After
    /// success every further operation returns `IncorrectState`.
    pub fn delete(&self, timeout: Duration) -> Result<()> {
        self.ensure_live()?;

        let outstanding = self.core.stats.outstanding();
        if outstanding != 0 {
            return Err(RegulatorError::resource_in_use(outstanding));
        }

        self.core.shutdown.open();
        if !self.core.exited.wait_timeout(timeout) {
            return Err(RegulatorError::Timeout);
        }

        if let Some(handle) = self.thread.lock().unwrap().take() {
            let _ = handle.join();
        }

        self.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.deleted.load(Ordering::SeqCst) {
            return Err(RegulatorError::IncorrectState);
        }
        Ok(())
    }
}

impl Drop for Regulator {
    fn drop(&mut self) {
        self.core.shutdown.open();
        if let Some(handle) = self.thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::Disposition;
    use crate::mem::failpoint;

    fn test_config() -> RegulatorConfig {
        RegulatorConfig::new()
            .with_max_message_size(16)
            .with_max_messages(10)
            .with_delivery_priority(16)
            .with_delivery_period(Duration::from_millis(100))
            .with_max_dequeue_per_period(3)
    }

    fn discard_deliverer(
    ) -> impl FnMut(&crate::Releaser<'_>, MessageBuffer, usize) -> Disposition {
        |_: &crate::Releaser<'_>, message: MessageBuffer, _: usize| {
            Disposition::ReleaseNow(message)
        }
    }

    #[test]
    fn test_create_allocation_failures_unwind() {
        // Allocation order during create: buffer storage, slot free list,
        // submission queue. Each injected failure must leave nothing
        // behind, so an identical create afterwards succeeds.
        for nth in 1..=3 {
            failpoint::arm(nth);
            let result = Regulator::create(test_config(), discard_deliverer());
            failpoint::disarm();

            match result {
                Err(RegulatorError::NoMemory { .. }) => {}
                other => panic!("expected NoMemory, got {:?}", other.map(|_| ())),
            }
        }

        let regulator = Regulator::create(test_config(), discard_deliverer()).unwrap();
        regulator.delete(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_operations_after_delete_fail() {
        let regulator = Regulator::create(test_config(), discard_deliverer()).unwrap();
        regulator.delete(Duration::from_secs(5)).unwrap();

        assert_eq!(
            regulator.obtain_buffer().err(),
            Some(RegulatorError::IncorrectState)
        );
        assert_eq!(
            regulator.statistics().err(),
            Some(RegulatorError::IncorrectState)
        );
        assert_eq!(
            regulator.delete(Duration::from_secs(5)),
            Err(RegulatorError::IncorrectState)
        );
    }
}
