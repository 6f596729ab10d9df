//! Bounded log of published lines, kept for debugging and the history route.

use lain_core::BroadcastMessage;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of published messages. The oldest entry is evicted
/// first once the log is full.
pub struct BroadcastHistory {
    capacity: usize,
    entries: Mutex<VecDeque<BroadcastMessage>>,
}

impl BroadcastHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, message: BroadcastMessage) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(message);
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<BroadcastMessage> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
