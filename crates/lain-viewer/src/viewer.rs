//! Applies relay envelopes for one viewer session.

use lain_core::{BroadcastMessage, ServerMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::dedup::RecentIds;
use crate::queue::PlaybackQueue;

/// Where the current line is displayed.
pub trait Caption: Send + Sync {
    fn show(&self, message: &BroadcastMessage);
}

/// What applying an envelope did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Initial snapshot applied; carries the current sequence id, if any.
    Synced(Option<u64>),
    /// A new line was shown, and queued for speech when `spoken`.
    Displayed { sequence_id: u64, spoken: bool },
    /// The line was already seen and was ignored.
    Duplicate(u64),
}

pub struct Viewer {
    recent: Mutex<RecentIds>,
    caption: Arc<dyn Caption>,
    queue: Option<PlaybackQueue>,
}

impl Viewer {
    /// A viewer without a queue never speaks.
    pub fn new(caption: Arc<dyn Caption>, queue: Option<PlaybackQueue>, dedup_capacity: usize) -> Self {
        Self {
            recent: Mutex::new(RecentIds::new(dedup_capacity)),
            caption,
            queue,
        }
    }

    pub fn queue(&self) -> Option<&PlaybackQueue> {
        self.queue.as_ref()
    }

    pub fn apply(&self, message: ServerMessage) -> ViewerEvent {
        match message {
            // Joining mid-stream: show what is on screen, never replay its audio.
            ServerMessage::Sync(payload) => match payload.current {
                Some(current) => {
                    self.recent.lock().observe(current.sequence_id);
                    self.caption.show(&current);
                    ViewerEvent::Synced(Some(current.sequence_id))
                }
                None => ViewerEvent::Synced(None),
            },
            ServerMessage::Broadcast(message) => {
                let sequence_id = message.sequence_id;
                if !self.recent.lock().observe(sequence_id) {
                    debug!(sequence_id, "Dropping duplicate broadcast");
                    return ViewerEvent::Duplicate(sequence_id);
                }

                self.caption.show(&message);
                let spoken = match &self.queue {
                    Some(queue) if message.should_speak => {
                        queue.enqueue(message.text);
                        true
                    }
                    _ => false,
                };
                ViewerEvent::Displayed { sequence_id, spoken }
            }
        }
    }
}
