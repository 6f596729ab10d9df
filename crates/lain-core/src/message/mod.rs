//! Wire envelopes exchanged between the relay and browsers.

pub mod model;

use serde::{Deserialize, Serialize};

use crate::chat::model::ChatMessage;
use crate::error::LainResult;
use model::{BroadcastMessage, SyncPayload};

/// Server to client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// One-shot state snapshot for a newly connected session.
    Sync(SyncPayload),
    /// A freshly published line.
    Broadcast(BroadcastMessage),
}

impl ServerMessage {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> LainResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame.
    pub fn from_json(json: &str) -> LainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sequence id carried by the message, if any.
    pub fn sequence_id(&self) -> Option<u64> {
        match self {
            Self::Sync(sync) => sync.current.as_ref().map(|m| m.sequence_id),
            Self::Broadcast(msg) => Some(msg.sequence_id),
        }
    }
}

/// Client to server messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Free-text chat from a viewer. Stored, never fed into generation.
    Chat(ChatMessage),
}

impl ClientMessage {
    /// Parse a JSON text frame.
    pub fn from_json(json: &str) -> LainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
