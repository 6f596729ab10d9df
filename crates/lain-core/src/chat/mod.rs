//! Viewer chat.
//!
//! Chat is telemetry: it is validated and stored for offline analysis and
//! never influences the next generated line.

pub mod model;

use chrono::Utc;

use crate::error::{LainError, LainResult};
use model::{ChatEntry, ChatMessage};

/// Longest accepted chat line, in characters.
pub const MAX_CHAT_CHARS: usize = 500;

/// Display names are cut to this many characters.
pub const MAX_NAME_CHARS: usize = 32;

/// Name used when a viewer does not give one.
pub const DEFAULT_DISPLAY_NAME: &str = "anonymous";

/// Validate a chat message received on `session_id`.
pub fn accept_chat(session_id: &str, message: ChatMessage) -> LainResult<ChatEntry> {
    let text = message.text.trim();
    if text.is_empty() {
        return Err(LainError::validation("chat text is empty"));
    }
    if text.chars().count() > MAX_CHAT_CHARS {
        return Err(LainError::validation(format!(
            "chat text exceeds {} characters",
            MAX_CHAT_CHARS
        )));
    }

    let display_name = message
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.chars().take(MAX_NAME_CHARS).collect::<String>())
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

    Ok(ChatEntry {
        session_id: session_id.to_string(),
        display_name,
        text: text.to_string(),
        received_at: Utc::now(),
    })
}
