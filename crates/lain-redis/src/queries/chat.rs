//! Viewer chat queries, stored in a capped Redis stream.

use lain_core::chat::model::ChatEntry;
use redis::streams::{StreamMaxlen, StreamRangeReply};
use redis::AsyncCommands;
use tracing::warn;

use super::KEY_PREFIX;
use crate::client::{RedisPool, RedisResult};

/// Approximate number of chat lines kept.
pub const CHAT_STREAM_MAXLEN: usize = 10_000;

pub fn chat_stream_key() -> String {
    format!("{}:chat", KEY_PREFIX)
}

/// Append a chat line.
pub async fn append_chat(pool: &RedisPool, entry: &ChatEntry) -> RedisResult<()> {
    let json = serde_json::to_string(entry)?;
    let mut conn = pool.clone();

    let fields = [
        ("session", entry.session_id.as_str()),
        ("name", entry.display_name.as_str()),
        ("data", json.as_str()),
    ];
    conn.xadd_maxlen::<_, _, _, _, ()>(
        chat_stream_key(),
        StreamMaxlen::Approx(CHAT_STREAM_MAXLEN),
        "*",
        &fields,
    )
    .await?;

    Ok(())
}

/// Most recent chat lines, newest first.
pub async fn recent_chat(pool: &RedisPool, limit: usize) -> RedisResult<Vec<ChatEntry>> {
    let mut conn = pool.clone();
    let reply: StreamRangeReply = conn
        .xrevrange_count(chat_stream_key(), "+", "-", limit)
        .await?;

    let mut entries = Vec::with_capacity(reply.ids.len());
    for id in reply.ids {
        let Some(json) = id.get::<String>("data") else {
            continue;
        };
        match serde_json::from_str(&json) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(stream_id = %id.id, error = %e, "Skipping malformed chat entry"),
        }
    }
    Ok(entries)
}
