//! Exclusive-ownership message buffer handle

use std::fmt;
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use crate::error::{RegulatorError, Result};
use crate::pool::arena::SlotArena;

/// Handle to one pool slot, exclusively owned by its holder.
///
/// Minted by [`Regulator::obtain_buffer`](crate::Regulator::obtain_buffer)
/// and consumed by `send` or `release_buffer`, so a buffer can never be
/// queued twice or released twice. Dropping a handle without releasing it
/// leaks the slot for the life of the instance.
pub struct MessageBuffer {
    arena: Arc<SlotArena>,
    slot: usize,
    data: NonNull<u8>,
    capacity: usize,
}

// The slot's bytes belong to this handle alone until it is consumed.
unsafe impl Send for MessageBuffer {}

impl MessageBuffer {
    pub(crate) fn new(arena: Arc<SlotArena>, slot: usize) -> Self {
        let data = arena.slot_ptr(slot);
        let capacity = arena.slot_size();
        Self {
            arena,
            slot,
            data,
            capacity,
        }
    }

    /// Buffer capacity in bytes (the configured `max_message_size`)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The buffer contents as a byte slice
    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.capacity) }
    }

    /// The buffer contents as a mutable byte slice
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.capacity) }
    }

    /// Copy `bytes` into the start of the buffer
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.capacity {
            return Err(RegulatorError::invalid_size("message length"));
        }
        self.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn arena(&self) -> &Arc<SlotArena> {
        &self.arena
    }
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("slot", &self.slot)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl AsRef<[u8]> for MessageBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for MessageBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_back() {
        let arena = SlotArena::new(1, 16).unwrap();
        let mut buffer = arena.try_take().unwrap();

        buffer.write(b"hello").unwrap();
        assert_eq!(&buffer.as_slice()[..5], b"hello");

        arena.put_back(buffer);
    }

    #[test]
    fn test_write_too_long_rejected() {
        let arena = SlotArena::new(1, 4).unwrap();
        let mut buffer = arena.try_take().unwrap();

        assert_eq!(
            buffer.write(b"too long for slot"),
            Err(RegulatorError::invalid_size("message length"))
        );

        arena.put_back(buffer);
    }

    #[test]
    fn test_slot_contents_survive_round_trip() {
        // Contents are not zeroed on release; a reobtained slot simply
        // carries stale bytes, matching a fixed-partition allocator.
        let arena = SlotArena::new(1, 8).unwrap();

        let mut buffer = arena.try_take().unwrap();
        buffer.write(b"payload!").unwrap();
        arena.put_back(buffer);

        let buffer = arena.try_take().unwrap();
        assert_eq!(buffer.as_slice(), b"payload!");
        arena.put_back(buffer);
    }
}
