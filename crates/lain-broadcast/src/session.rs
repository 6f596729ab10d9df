//! A connected viewer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque per-connection identifier.
pub type SessionId = String;

/// Why a frame could not be handed to a session's writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryError {
    /// The outbound buffer is full; the client is not keeping up.
    Full,
    /// The writer task is gone.
    Closed,
}

/// One connected viewer.
///
/// The sender half is the session's transport handle: frames pushed into it
/// are written to the socket by the connection's writer task. Only the
/// registry writes to it.
pub struct Session {
    pub id: SessionId,
    tx: mpsc::Sender<Arc<str>>,
    closing: AtomicBool,
}

impl Session {
    /// Create a session with a fresh id and an outbound buffer of `buffer`
    /// frames. The receiver belongs to the connection's writer task.
    pub fn new(buffer: usize) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        Self::with_id(uuid::Uuid::new_v4().to_string(), buffer)
    }

    pub fn with_id(id: impl Into<SessionId>, buffer: usize) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let session = Self {
            id: id.into(),
            tx,
            closing: AtomicBool::new(false),
        };
        (Arc::new(session), rx)
    }

    /// The client started closing the connection.
    pub fn mark_closing(&self) {
        self.closing.store(true, Ordering::Relaxed);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Relaxed)
    }

    /// Whether the writer task is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) fn try_deliver(&self, frame: Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
