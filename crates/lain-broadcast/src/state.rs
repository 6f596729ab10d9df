//! Broadcast State Store.
//!
//! Single source of truth for what is currently playing. There is one
//! instance per process, created at startup and handed to the scheduler and
//! the registry explicitly.
//!
//! The host runtime is multi-threaded, so `current`, `generating` and
//! `last_broadcast_at` share one mutex. Critical sections only read or swap
//! those fields and never cross an `.await`.

use chrono::{DateTime, Utc};
use lain_core::{BroadcastMessage, StatusReport, SyncPayload};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::history::BroadcastHistory;

#[derive(Default)]
struct Inner {
    current: Option<BroadcastMessage>,
    generating: bool,
    last_broadcast_at: Option<DateTime<Utc>>,
}

/// Process-wide broadcast state.
pub struct BroadcastState {
    inner: Mutex<Inner>,
    sequence: AtomicU64,
    history: BroadcastHistory,
}

impl BroadcastState {
    /// Empty state whose first sequence id is 1.
    pub fn new(history_capacity: usize) -> Self {
        Self::with_sequence_seed(history_capacity, 0)
    }

    /// Empty state whose first sequence id is `seed + 1`.
    pub fn with_sequence_seed(history_capacity: usize, seed: u64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            sequence: AtomicU64::new(seed),
            history: BroadcastHistory::new(history_capacity),
        }
    }

    /// Seed sequence ids from the wall clock so they keep increasing across
    /// restarts of the relay.
    pub fn seeded_from_clock(history_capacity: usize) -> Self {
        let seed = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        Self::with_sequence_seed(history_capacity, seed)
    }

    /// Reserve the next sequence id.
    pub fn next_sequence_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the current message.
    pub fn publish(&self, message: BroadcastMessage) {
        let mut inner = self.inner.lock();
        inner.last_broadcast_at = Some(message.created_at);
        inner.current = Some(message);
    }

    /// The current message, or `None` if nothing was ever broadcast.
    pub fn current(&self) -> Option<BroadcastMessage> {
        self.inner.lock().current.clone()
    }

    pub fn last_broadcast_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().last_broadcast_at
    }

    pub fn is_generating(&self) -> bool {
        self.inner.lock().generating
    }

    pub fn set_generating(&self, generating: bool) {
        self.inner.lock().generating = generating;
    }

    /// Atomically flip `generating` from false to true.
    ///
    /// Returns `None` when a generation is already in flight. The returned
    /// guard clears the flag when dropped, whatever path the caller takes.
    pub fn try_begin_generation(self: &Arc<Self>) -> Option<GenerationGuard> {
        let mut inner = self.inner.lock();
        if inner.generating {
            return None;
        }
        inner.generating = true;
        Some(GenerationGuard {
            state: Arc::clone(self),
        })
    }

    /// Snapshot for a newly connected session.
    pub fn sync_payload(&self) -> SyncPayload {
        let inner = self.inner.lock();
        SyncPayload {
            current: inner.current.clone(),
            generating: inner.generating,
            last_broadcast_at: inner.last_broadcast_at,
        }
    }

    /// Status surface, given the number of connected sessions.
    pub fn status(&self, active_session_count: usize) -> StatusReport {
        let inner = self.inner.lock();
        StatusReport {
            active_session_count,
            generating: inner.generating,
            last_broadcast_at: inner.last_broadcast_at,
        }
    }

    pub fn history(&self) -> &BroadcastHistory {
        &self.history
    }
}

/// Clears the generating flag on drop.
pub struct GenerationGuard {
    state: Arc<BroadcastState>,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.state.set_generating(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lain_core::Mood;

    #[test]
    fn test_starts_empty() {
        let state = BroadcastState::new(10);
        assert!(state.current().is_none());
        assert!(state.last_broadcast_at().is_none());
        assert!(!state.is_generating());
        let sync = state.sync_payload();
        assert!(sync.current.is_none());
    }

    #[test]
    fn test_publish_replaces_current() {
        let state = BroadcastState::new(10);
        let first = BroadcastMessage::new(state.next_sequence_id(), "one", Mood::Neutral, "idle").unwrap();
        let second = BroadcastMessage::new(state.next_sequence_id(), "two", Mood::Cryptic, "glitch").unwrap();
        state.publish(first);
        state.publish(second.clone());

        assert_eq!(state.current(), Some(second.clone()));
        assert_eq!(state.last_broadcast_at(), Some(second.created_at));
        assert_eq!(state.sync_payload().current.unwrap().sequence_id, 2);
    }

    #[test]
    fn test_sequence_ids_increase_from_seed() {
        let state = BroadcastState::with_sequence_seed(1, 41);
        assert_eq!(state.next_sequence_id(), 42);
        assert_eq!(state.next_sequence_id(), 43);
    }

    #[test]
    fn test_clock_seed_is_large() {
        let state = BroadcastState::seeded_from_clock(1);
        assert!(state.next_sequence_id() > 1_600_000_000_000);
    }

    #[test]
    fn test_guard_is_exclusive_and_released_on_drop() {
        let state = Arc::new(BroadcastState::new(1));
        let guard = state.try_begin_generation().expect("first guard");
        assert!(state.is_generating());
        assert!(state.try_begin_generation().is_none());

        drop(guard);
        assert!(!state.is_generating());
        assert!(state.try_begin_generation().is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let state = Arc::new(BroadcastState::new(1));
        let cloned = Arc::clone(&state);
        let result = std::thread::spawn(move || {
            let _guard = cloned.try_begin_generation().unwrap();
            panic!("inference blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(!state.is_generating());
    }

    #[test]
    fn test_status() {
        let state = BroadcastState::new(1);
        state.set_generating(true);
        let status = state.status(3);
        assert_eq!(status.active_session_count, 3);
        assert!(status.generating);
        assert!(status.last_broadcast_at.is_none());
    }
}
