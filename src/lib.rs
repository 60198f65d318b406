//! # Regulator - Admission-Controlled, Rate-Paced Message Delivery
//!
//! A regulator decouples bursty message producers from a consumer that can
//! only absorb a bounded rate. Producers obtain fixed-size buffers from a
//! finite pool, fill them, and send them into a bounded FIFO; a dedicated
//! periodic delivery thread drains at most a configured number of messages
//! per period and hands each one to a user-supplied deliverer.
//!
//! ## Features
//!
//! - **Admission control**: a fixed pool of `max_messages` buffers; once
//!   all are outstanding, `obtain_buffer` refuses with a backpressure
//!   signal instead of blocking
//! - **Pacing**: a hard ceiling of `max_dequeue_per_period` deliveries per
//!   `delivery_period`, regardless of burst shape
//! - **Strict FIFO**: delivery order equals submission order
//! - **Typed ownership transfer**: buffer handles are consumed by `send`
//!   and `release_buffer`, so double-release and use-after-send are
//!   compile errors
//! - **Consistent statistics**: obtained/released/delivered and period
//!   counters, snapshot-consistent at every observation
//!
//! ## Data flow
//!
//! ```text
//!  producers                 regulator                    consumer
//! ┌──────────┐  obtain  ┌──────────────────┐
//! │ thread A ├─────────►│   buffer pool    │
//! │ thread B │   send   ├──────────────────┤  drain ≤ N   ┌───────────┐
//! │   ...    ├─────────►│  bounded FIFO    ├─────────────►│ deliverer │
//! └──────────┘          ├──────────────────┤  per period  └─────┬─────┘
//!                       │ delivery thread  │     release        │
//!                       └──────────────────┘◄───────────────────┘
//! ```
//!
//! The delivery thread paces itself on a monotonic clock and records
//! missed period boundaries; see [`RegulatorStatistics`].

// Core modules
pub mod config;
pub mod delivery;
pub mod error;
pub mod instance;
pub mod pool;
pub mod stats;

mod mem;
mod pacing;
mod queue;
mod sync;

// Main API re-exports
pub use config::RegulatorConfig;
pub use delivery::{Deliverer, DeliveryState, Disposition, Releaser};
pub use error::{RegulatorError, Result};
pub use instance::{Regulator, SendRejected};
pub use pool::MessageBuffer;
pub use stats::RegulatorStatistics;

/// Default configuration constants
pub mod defaults {
    use std::time::Duration;

    /// Default size of each message buffer
    pub const DEFAULT_MESSAGE_SIZE: usize = 1024;

    /// Default number of buffers in the pool
    pub const DEFAULT_MAX_MESSAGES: usize = 16;

    /// Default delivery thread priority
    pub const DEFAULT_DELIVERY_PRIORITY: u32 = 16;

    /// Default interval between delivery drains
    pub const DEFAULT_DELIVERY_PERIOD: Duration = Duration::from_secs(1);

    /// Default ceiling on messages delivered per period
    pub const DEFAULT_DEQUEUE_PER_PERIOD: usize = 1;
}
