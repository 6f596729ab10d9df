//! Broadcast history route handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use lain_core::BroadcastMessage;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Recent broadcasts, newest first.
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<BroadcastMessage>> {
    let history = state.broadcast_state().history();
    let limit = query.limit.unwrap_or(history.capacity());
    Json(history.recent(limit))
}

/// The current broadcast, or `null` before the first one.
pub async fn current(State(state): State<AppState>) -> Json<Option<BroadcastMessage>> {
    Json(state.broadcast_state().current())
}
