//! Regulator instance configuration

use std::time::Duration;

use crate::defaults;
use crate::error::{RegulatorError, Result};

/// Configuration for a regulator instance
///
/// Validated once by [`Regulator::create`](crate::Regulator::create) and
/// treated as immutable for the life of the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegulatorConfig {
    /// Size of each message buffer in bytes
    pub max_message_size: usize,
    /// Number of buffers in the pool; also the submission queue capacity
    pub max_messages: usize,
    /// Delivery thread priority; lower values are more urgent
    pub delivery_priority: u32,
    /// Delivery thread stack size in bytes; 0 selects the platform default
    pub delivery_stack_size: usize,
    /// Interval between delivery drains
    pub delivery_period: Duration,
    /// Ceiling on messages delivered per period
    pub max_dequeue_per_period: usize,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            max_message_size: defaults::DEFAULT_MESSAGE_SIZE,
            max_messages: defaults::DEFAULT_MAX_MESSAGES,
            delivery_priority: defaults::DEFAULT_DELIVERY_PRIORITY,
            delivery_stack_size: 0,
            delivery_period: defaults::DEFAULT_DELIVERY_PERIOD,
            max_dequeue_per_period: defaults::DEFAULT_DEQUEUE_PER_PERIOD,
        }
    }
}

impl RegulatorConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the per-message buffer size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the pool and queue capacity
    pub fn with_max_messages(mut self, count: usize) -> Self {
        self.max_messages = count;
        self
    }

    /// Set the delivery thread priority
    pub fn with_delivery_priority(mut self, priority: u32) -> Self {
        self.delivery_priority = priority;
        self
    }

    /// Set the delivery thread stack size (0 = platform default)
    pub fn with_delivery_stack_size(mut self, size: usize) -> Self {
        self.delivery_stack_size = size;
        self
    }

    /// Set the interval between delivery drains
    pub fn with_delivery_period(mut self, period: Duration) -> Self {
        self.delivery_period = period;
        self
    }

    /// Set the per-period delivery ceiling
    pub fn with_max_dequeue_per_period(mut self, count: usize) -> Self {
        self.max_dequeue_per_period = count;
        self
    }

    /// Validate the configuration
    ///
    /// `delivery_period` is deliberately not validated here; a zero period
    /// is only rejected by the delivery thread when it creates its pacing
    /// timer, after creation has already returned (see
    /// [`DeliveryState::Failed`](crate::DeliveryState)).
    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            return Err(RegulatorError::invalid_number("max_messages"));
        }

        if self.max_message_size == 0 {
            return Err(RegulatorError::invalid_size("max_message_size"));
        }

        if self.max_dequeue_per_period == 0 {
            return Err(RegulatorError::invalid_number("max_dequeue_per_period"));
        }

        if self.delivery_priority == 0 {
            return Err(RegulatorError::invalid_priority(self.delivery_priority));
        }

        Ok(())
    }

    /// Total bytes of buffer storage the pool will allocate
    pub fn pool_storage_size(&self) -> usize {
        self.max_message_size * self.max_messages
    }
}
