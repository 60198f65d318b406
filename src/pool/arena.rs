//! Fixed-size slot arena with an index free list

use std::cell::UnsafeCell;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use crate::error::{RegulatorError, Result};
use crate::mem;
use crate::pool::buffer::MessageBuffer;

/// Arena of `slot_count` buffers of `slot_size` bytes each.
///
/// Slots are identified by index and tracked through a free list, so
/// ownership bookkeeping never involves pointer arithmetic on the caller
/// side. A slot's bytes are reachable only through the [`MessageBuffer`]
/// handle minted when the slot is taken; the handle is not `Clone`, which
/// is what makes the exclusive-ownership invariant hold.
pub(crate) struct SlotArena {
    /// Backing storage, `slot_count * slot_size` bytes
    storage: Box<[UnsafeCell<u8>]>,
    slot_size: usize,
    slot_count: usize,
    /// Indices of slots currently in the pool
    free: Mutex<Vec<usize>>,
}

// Slot bytes are only ever touched through the one live handle per slot.
unsafe impl Send for SlotArena {}
unsafe impl Sync for SlotArena {}

impl SlotArena {
    /// Allocate an arena with every slot on the free list
    pub fn new(slot_count: usize, slot_size: usize) -> Result<Arc<Self>> {
        if slot_count == 0 {
            return Err(RegulatorError::invalid_number("slot_count"));
        }
        if slot_size == 0 {
            return Err(RegulatorError::invalid_size("slot_size"));
        }

        let storage = try_storage(slot_count * slot_size)?;
        let free = try_free_list(slot_count)?;

        Ok(Arc::new(Self {
            storage,
            slot_size,
            slot_count,
            free: Mutex::new(free),
        }))
    }

    /// Take a free slot, or `None` when every slot is outstanding
    pub fn try_take(self: &Arc<Self>) -> Option<MessageBuffer> {
        let slot = self.free.lock().unwrap().pop()?;
        Some(MessageBuffer::new(Arc::clone(self), slot))
    }

    /// Return a buffer's slot to the free list
    pub fn put_back(&self, buffer: MessageBuffer) {
        debug_assert!(std::ptr::eq(Arc::as_ptr(buffer.arena()), self));
        let slot = buffer.slot();
        let mut free = self.free.lock().unwrap();
        debug_assert!(!free.contains(&slot));
        free.push(slot);
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn capacity(&self) -> usize {
        self.slot_count
    }

    /// Number of slots currently in the pool
    pub fn free_count(&self) -> usize {
        self.free.lock().unwrap().len()
    }

    /// Pointer to the first byte of `slot`
    pub(crate) fn slot_ptr(&self, slot: usize) -> NonNull<u8> {
        debug_assert!(slot < self.slot_count);
        let first = &self.storage[slot * self.slot_size];
        // Points into live arena storage, never null.
        unsafe { NonNull::new_unchecked(first.get()) }
    }
}

impl fmt::Debug for SlotArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotArena")
            .field("slot_size", &self.slot_size)
            .field("slot_count", &self.slot_count)
            .field("free", &self.free_count())
            .finish()
    }
}

fn try_storage(len: usize) -> Result<Box<[UnsafeCell<u8>]>> {
    mem::check("buffer storage")?;
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| RegulatorError::no_memory("buffer storage"))?;
    cells.extend((0..len).map(|_| UnsafeCell::new(0u8)));
    Ok(cells.into_boxed_slice())
}

fn try_free_list(slot_count: usize) -> Result<Vec<usize>> {
    mem::check("slot free list")?;
    let mut free = Vec::new();
    free.try_reserve_exact(slot_count)
        .map_err(|_| RegulatorError::no_memory("slot free list"))?;
    // Reversed so slot 0 is handed out first.
    free.extend((0..slot_count).rev());
    Ok(free)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::failpoint;

    #[test]
    fn test_take_and_put_back_round_trip() {
        let arena = SlotArena::new(4, 32).unwrap();
        assert_eq!(arena.free_count(), 4);

        let buffer = arena.try_take().unwrap();
        assert_eq!(buffer.capacity(), 32);
        assert_eq!(arena.free_count(), 3);

        arena.put_back(buffer);
        assert_eq!(arena.free_count(), 4);
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let arena = SlotArena::new(2, 16).unwrap();

        let first = arena.try_take().unwrap();
        let second = arena.try_take().unwrap();
        assert!(arena.try_take().is_none());

        arena.put_back(first);
        let third = arena.try_take().unwrap();
        assert!(arena.try_take().is_none());

        arena.put_back(second);
        arena.put_back(third);
        assert_eq!(arena.free_count(), 2);
    }

    #[test]
    fn test_slots_are_distinct() {
        let arena = SlotArena::new(3, 8).unwrap();

        let mut a = arena.try_take().unwrap();
        let mut b = arena.try_take().unwrap();

        a.as_mut_slice().fill(0xaa);
        b.as_mut_slice().fill(0xbb);

        assert!(a.as_slice().iter().all(|&byte| byte == 0xaa));
        assert!(b.as_slice().iter().all(|&byte| byte == 0xbb));

        arena.put_back(a);
        arena.put_back(b);
    }

    #[test]
    fn test_zero_slot_count_rejected() {
        assert!(SlotArena::new(0, 16).is_err());
        assert!(SlotArena::new(16, 0).is_err());
    }

    #[test]
    fn test_injected_allocation_failure() {
        failpoint::arm(1);
        let result = SlotArena::new(4, 32);
        failpoint::disarm();
        assert_eq!(
            result.err(),
            Some(RegulatorError::no_memory("buffer storage"))
        );

        failpoint::arm(2);
        let result = SlotArena::new(4, 32);
        failpoint::disarm();
        assert_eq!(
            result.err(),
            Some(RegulatorError::no_memory("slot free list"))
        );

        // Nothing leaked: the same construction succeeds afterwards.
        assert!(SlotArena::new(4, 32).is_ok());
    }
}
