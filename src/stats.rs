//! Regulator statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the running counters of a regulator instance
///
/// All counters increase monotonically for the life of the instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegulatorStatistics {
    /// Buffers handed out by `obtain_buffer`
    pub obtained: u64,
    /// Buffers returned to the pool, by either the framework or a deliverer
    pub released: u64,
    /// Messages handed to the deliverer
    pub delivered: u64,
    /// Period boundaries serviced by the delivery thread
    pub period_count: u64,
    /// Period boundaries the delivery thread failed to reach in time
    pub period_missed_count: u64,
}

impl RegulatorStatistics {
    /// Buffers currently outside the free pool
    pub fn outstanding(&self) -> u64 {
        self.obtained - self.released
    }
}

/// Thread-safe counter block shared between producers and the delivery thread
#[derive(Debug, Default)]
pub(crate) struct AtomicRegulatorStats {
    obtained: AtomicU64,
    released: AtomicU64,
    delivered: AtomicU64,
    period_count: AtomicU64,
    period_missed_count: AtomicU64,
}

impl AtomicRegulatorStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_obtained(&self) {
        self.obtained.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_released(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    /// Must be called after the release accounting for the same message.
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_period(&self, missed: bool) {
        self.period_count.fetch_add(1, Ordering::SeqCst);
        if missed {
            self.period_missed_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Buffers currently outside the free pool.
    ///
    /// `released` is read before `obtained`: every release is preceded by
    /// its obtain, so this order keeps the difference non-negative even
    /// while producers are active.
    pub fn outstanding(&self) -> u64 {
        let released = self.released.load(Ordering::SeqCst);
        let obtained = self.obtained.load(Ordering::SeqCst);
        obtained - released
    }

    /// Consistent snapshot of all counters.
    ///
    /// Load order is `delivered`, then `released`, then `obtained`; each
    /// counter only grows and each message is released before it is counted
    /// delivered, so a snapshot never observes `delivered > released` or
    /// `released > obtained`.
    pub fn snapshot(&self) -> RegulatorStatistics {
        let delivered = self.delivered.load(Ordering::SeqCst);
        let released = self.released.load(Ordering::SeqCst);
        let obtained = self.obtained.load(Ordering::SeqCst);
        RegulatorStatistics {
            obtained,
            released,
            delivered,
            period_count: self.period_count.load(Ordering::SeqCst),
            period_missed_count: self.period_missed_count.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = AtomicRegulatorStats::new();
        assert_eq!(stats.snapshot(), RegulatorStatistics::default());
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_obtain_release_accounting() {
        let stats = AtomicRegulatorStats::new();

        stats.record_obtained();
        stats.record_obtained();
        assert_eq!(stats.outstanding(), 2);

        stats.record_released();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.obtained, 2);
        assert_eq!(snapshot.released, 1);
        assert_eq!(snapshot.outstanding(), 1);
    }

    #[test]
    fn test_period_accounting() {
        let stats = AtomicRegulatorStats::new();

        stats.record_period(false);
        stats.record_period(true);
        stats.record_period(false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.period_count, 3);
        assert_eq!(snapshot.period_missed_count, 1);
    }

    #[test]
    fn test_delivered_never_exceeds_released() {
        let stats = AtomicRegulatorStats::new();

        stats.record_obtained();
        stats.record_released();
        stats.record_delivered();

        let snapshot = stats.snapshot();
        assert!(snapshot.delivered <= snapshot.released);
    }
}
