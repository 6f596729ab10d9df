//! Application state.

use lain_broadcast::{BroadcastState, SessionRegistry};
use lain_redis::ChatStore;
use lain_services::InferenceClient;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub inference: Arc<dyn InferenceClient>,
    pub chat: Arc<dyn ChatStore>,
    /// Outbound frame buffer per viewer.
    pub session_buffer: usize,
}

impl AppState {
    pub fn new(
        registry: Arc<SessionRegistry>,
        inference: Arc<dyn InferenceClient>,
        chat: Arc<dyn ChatStore>,
        session_buffer: usize,
    ) -> Self {
        Self {
            registry,
            inference,
            chat,
            session_buffer,
        }
    }

    pub fn broadcast_state(&self) -> &Arc<BroadcastState> {
        self.registry.state()
    }
}
