//! Viewer chat models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat as sent by a browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub text: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A validated chat line, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub session_id: String,
    pub display_name: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}
