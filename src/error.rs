//! Error types and handling for the regulator

/// Result type alias for regulator operations
pub type Result<T> = std::result::Result<T, RegulatorError>;

/// Error taxonomy for the regulator
///
/// Every fallible public operation reports one of these kinds; there are no
/// panics for expected error conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegulatorError {
    /// A required count attribute is zero or otherwise out of range
    #[error("invalid count for {parameter}: must be greater than zero")]
    InvalidNumber { parameter: &'static str },

    /// A size attribute is zero or exceeds the configured maximum
    #[error("invalid size for {parameter}")]
    InvalidSize { parameter: &'static str },

    /// The delivery thread priority is outside the valid range
    #[error("invalid delivery thread priority {priority}")]
    InvalidPriority { priority: u32 },

    /// Operation attempted on an instance that has already been deleted
    #[error("regulator instance is not in the created state")]
    IncorrectState,

    /// Backing storage could not be allocated during creation
    #[error("out of memory allocating {what}")]
    NoMemory { what: &'static str },

    /// A system-wide object limit prevented creating a collaborator resource
    #[error("system limit reached creating {resource}")]
    TooMany { resource: &'static str },

    /// Delete attempted while buffers are still outstanding
    #[error("{outstanding} buffer(s) still outstanding")]
    ResourceInUse { outstanding: u64 },

    /// All buffers are outstanding; the producer must retry later or drop
    ///
    /// This is the admission-control backpressure signal, not a fatal error.
    #[error("all {capacity} buffers are outstanding")]
    Exhausted { capacity: usize },

    /// The submission queue is at capacity
    ///
    /// Unreachable when every obtained buffer is either sent or released,
    /// since the queue is sized to hold every buffer in the pool.
    #[error("submission queue is full ({capacity} entries)")]
    QueueFull { capacity: usize },

    /// The delivery thread did not quiesce within the delete timeout
    #[error("timed out waiting for the delivery thread to stop")]
    Timeout,
}

impl RegulatorError {
    /// Create an invalid count error
    pub fn invalid_number(parameter: &'static str) -> Self {
        Self::InvalidNumber { parameter }
    }

    /// Create an invalid size error
    pub fn invalid_size(parameter: &'static str) -> Self {
        Self::InvalidSize { parameter }
    }

    /// Create an invalid priority error
    pub fn invalid_priority(priority: u32) -> Self {
        Self::InvalidPriority { priority }
    }

    /// Create an out of memory error
    pub fn no_memory(what: &'static str) -> Self {
        Self::NoMemory { what }
    }

    /// Create an object limit error
    pub fn too_many(resource: &'static str) -> Self {
        Self::TooMany { resource }
    }

    /// Create a buffers outstanding error
    pub fn resource_in_use(outstanding: u64) -> Self {
        Self::ResourceInUse { outstanding }
    }

    /// Create a pool exhaustion signal
    pub fn exhausted(capacity: usize) -> Self {
        Self::Exhausted { capacity }
    }

    /// Create a queue capacity violation error
    pub fn queue_full(capacity: usize) -> Self {
        Self::QueueFull { capacity }
    }
}
