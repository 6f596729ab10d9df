//! WebSocket handler for viewer sessions.
//!
//! Each connection becomes a [`Session`] in the registry. The registry owns
//! the only strong reference, so unregistering a session (on client close or
//! on a failed fan-out) drops its sender and ends the writer task.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use lain_broadcast::Session;
use lain_core::chat::accept_chat;
use lain_core::ClientMessage;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (session, mut outbound) = Session::new(state.session_buffer);
    let session_id = session.id.clone();
    let handle: Weak<Session> = Arc::downgrade(&session);

    if let Err(e) = state.registry.register(session).await {
        warn!(session_id = %session_id, error = %e, "Failed to register viewer session");
        return;
    }

    let (mut sender, mut receiver) = socket.split();
    let sessions = state.registry.session_count().await;
    info!(session_id = %session_id, sessions, "Viewer connected");

    // Drain the session's outbound frames into the socket
    let writer_id = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                debug!(session_id = %writer_id, "WebSocket send failed, client disconnected");
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Handle incoming messages from the viewer
    let reader_state = state.clone();
    let reader_id = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_client_frame(&reader_state, &reader_id, text.as_str()).await;
                }
                Message::Close(_) => {
                    debug!(session_id = %reader_id, "Viewer sent close frame");
                    if let Some(session) = handle.upgrade() {
                        session.mark_closing();
                    }
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry.unregister(&session_id).await;
    info!(session_id = %session_id, "Viewer disconnected");
}

/// Viewer chat is validated and stored; nothing else consumes it.
async fn handle_client_frame(state: &AppState, session_id: &str, text: &str) {
    let message = match ClientMessage::from_json(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(session_id, error = %e, "Ignoring malformed client frame");
            return;
        }
    };

    match message {
        ClientMessage::Chat(chat) => match accept_chat(session_id, chat) {
            Ok(entry) => {
                if let Err(e) = state.chat.append_chat(&entry).await {
                    warn!(session_id, error = %e, "Failed to store chat message");
                }
            }
            Err(e) => debug!(session_id, error = %e, "Rejected chat message"),
        },
    }
}
