//! Session Registry and fan-out.

use lain_core::{BroadcastMessage, LainError, LainResult, ServerMessage, SyncPayload};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::session::{DeliveryError, Session, SessionId};
use crate::state::BroadcastState;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Sessions the frame was queued for.
    pub delivered: usize,
    /// Sessions closing or already closed.
    pub skipped: usize,
    /// Sessions whose transport failed and were unregistered.
    pub dropped: usize,
}

/// Tracks connected sessions and delivers broadcasts to them.
///
/// Registration and fan-out take the same lock, so a session's sync frame
/// always precedes any broadcast it receives.
pub struct SessionRegistry {
    state: Arc<BroadcastState>,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(state: Arc<BroadcastState>) -> Self {
        Self {
            state,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot handed to a newly connecting session.
    pub fn sync_payload(&self) -> SyncPayload {
        self.state.sync_payload()
    }

    /// Send the sync frame to `session`, then add it to the membership set.
    pub async fn register(&self, session: Arc<Session>) -> LainResult<()> {
        let mut sessions = self.sessions.write().await;

        let sync = ServerMessage::Sync(self.sync_payload());
        let frame: Arc<str> = Arc::from(sync.to_json()?);
        if let Err(e) = session.try_deliver(frame) {
            return Err(LainError::Transport(format!(
                "could not deliver sync to session {}: {:?}",
                session.id, e
            )));
        }

        let id = session.id.clone();
        sessions.insert(id.clone(), session);
        info!(session_id = %id, sessions = sessions.len(), "Session registered");
        Ok(())
    }

    /// Remove a session. Safe to call for sessions already gone.
    pub async fn unregister(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id, "Session unregistered");
        }
        removed
    }

    /// Deliver `message` to every open session.
    ///
    /// Closing sessions are skipped. A session whose transport fails is
    /// unregistered and delivery continues with the others.
    pub async fn broadcast(&self, message: &BroadcastMessage) -> FanOutReport {
        let frame: Arc<str> = match ServerMessage::Broadcast(message.clone()).to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(sequence_id = message.sequence_id, error = %e, "Failed to serialize broadcast");
                return FanOutReport::default();
            }
        };

        let mut report = FanOutReport::default();
        let mut stale = Vec::new();
        let mut failed = Vec::new();

        {
            let sessions = self.sessions.read().await;
            for session in sessions.values() {
                if session.is_closing() {
                    report.skipped += 1;
                    continue;
                }
                match session.try_deliver(Arc::clone(&frame)) {
                    Ok(()) => report.delivered += 1,
                    Err(DeliveryError::Closed) => {
                        report.skipped += 1;
                        stale.push(session.id.clone());
                    }
                    Err(DeliveryError::Full) => {
                        report.dropped += 1;
                        failed.push(session.id.clone());
                    }
                }
            }
        }

        if !stale.is_empty() || !failed.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &stale {
                sessions.remove(id);
                debug!(session_id = %id, "Pruned closed session");
            }
            for id in &failed {
                sessions.remove(id);
                warn!(session_id = %id, "Session transport failed during fan-out, unregistered");
            }
        }

        debug!(
            sequence_id = message.sequence_id,
            delivered = report.delivered,
            skipped = report.skipped,
            dropped = report.dropped,
            "Broadcast fanned out"
        );
        report
    }

    /// Number of registered sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub fn state(&self) -> &Arc<BroadcastState> {
        &self.state
    }
}
