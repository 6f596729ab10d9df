//! Broadcast domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LainError, LainResult};

/// Lain's mood. Only affects client-side presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Curious,
    Cryptic,
    Melancholic,
    Excited,
    Distant,
}

impl Mood {
    /// Every mood, in declaration order.
    pub const ALL: [Mood; 6] = [
        Self::Neutral,
        Self::Curious,
        Self::Cryptic,
        Self::Melancholic,
        Self::Excited,
        Self::Distant,
    ];

    /// Parse from string. Unknown moods fall back to neutral.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "curious" => Self::Curious,
            "cryptic" => Self::Cryptic,
            "melancholic" => Self::Melancholic,
            "excited" => Self::Excited,
            "distant" => Self::Distant,
            _ => Self::Neutral,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Curious => "curious",
            Self::Cryptic => "cryptic",
            Self::Melancholic => "melancholic",
            Self::Excited => "excited",
            Self::Distant => "distant",
        }
    }
}

fn default_should_speak() -> bool {
    true
}

/// A single line of dialogue distributed to every viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub text: String,
    pub mood: Mood,
    pub animation_hint: String,
    pub created_at: DateTime<Utc>,
    pub sequence_id: u64,
    #[serde(default = "default_should_speak")]
    pub should_speak: bool,
}

impl BroadcastMessage {
    /// Build a message stamped with the current time.
    ///
    /// Fails when the text is blank: a published line is never empty.
    pub fn new(
        sequence_id: u64,
        text: &str,
        mood: Mood,
        animation_hint: &str,
    ) -> LainResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LainError::validation("broadcast text is empty"));
        }

        Ok(Self {
            text: text.to_string(),
            mood,
            animation_hint: animation_hint.trim().to_string(),
            created_at: Utc::now(),
            sequence_id,
            should_speak: true,
        })
    }

    /// Mark whether viewers should speak this line aloud.
    pub fn with_speech(mut self, should_speak: bool) -> Self {
        self.should_speak = should_speak;
        self
    }
}

/// Snapshot sent once to a session as soon as it connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub current: Option<BroadcastMessage>,
    pub generating: bool,
    pub last_broadcast_at: Option<DateTime<Utc>>,
}

/// Health/status surface of the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub active_session_count: usize,
    pub generating: bool,
    pub last_broadcast_at: Option<DateTime<Utc>>,
}
