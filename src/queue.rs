//! Bounded FIFO submission queue

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{RegulatorError, Result};
use crate::mem;
use crate::pool::MessageBuffer;

/// A message in transit: the buffer and the number of valid bytes in it
#[derive(Debug)]
pub(crate) struct QueuedMessage {
    pub buffer: MessageBuffer,
    pub length: usize,
}

/// Bounded FIFO between producers and the delivery thread.
///
/// Capacity equals the pool capacity, so under correct use (every obtained
/// buffer is either sent once or released) enqueue can never find the
/// queue full; the capacity check exists as a defensive backstop.
#[derive(Debug)]
pub(crate) struct SubmissionQueue {
    entries: Mutex<VecDeque<QueuedMessage>>,
    capacity: usize,
}

impl SubmissionQueue {
    pub fn new(capacity: usize) -> Result<Self> {
        mem::check("submission queue")?;
        let mut entries = VecDeque::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|_| RegulatorError::no_memory("submission queue"))?;

        Ok(Self {
            entries: Mutex::new(entries),
            capacity,
        })
    }

    /// Append a message; on a full queue the message is handed back
    pub fn try_enqueue(
        &self,
        message: QueuedMessage,
    ) -> std::result::Result<(), QueuedMessage> {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity {
            return Err(message);
        }
        entries.push_back(message);
        Ok(())
    }

    /// Remove the oldest message, or `None` when the queue is empty
    pub fn try_dequeue(&self) -> Option<QueuedMessage> {
        self.entries.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SlotArena;

    #[test]
    fn test_fifo_order() {
        let arena = SlotArena::new(3, 8).unwrap();
        let queue = SubmissionQueue::new(3).unwrap();

        for length in [1usize, 2, 3] {
            let buffer = arena.try_take().unwrap();
            queue
                .try_enqueue(QueuedMessage { buffer, length })
                .unwrap();
        }
        assert_eq!(queue.len(), 3);

        for expected in [1usize, 2, 3] {
            let message = queue.try_dequeue().unwrap();
            assert_eq!(message.length, expected);
            arena.put_back(message.buffer);
        }
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn test_full_queue_hands_message_back() {
        let arena = SlotArena::new(2, 8).unwrap();
        let queue = SubmissionQueue::new(1).unwrap();

        let first = arena.try_take().unwrap();
        queue
            .try_enqueue(QueuedMessage {
                buffer: first,
                length: 4,
            })
            .unwrap();

        let second = arena.try_take().unwrap();
        let rejected = queue
            .try_enqueue(QueuedMessage {
                buffer: second,
                length: 4,
            })
            .unwrap_err();

        // The caller keeps ownership of the rejected buffer.
        arena.put_back(rejected.buffer);
        arena.put_back(queue.try_dequeue().unwrap().buffer);
        assert_eq!(arena.free_count(), 2);
    }
}
