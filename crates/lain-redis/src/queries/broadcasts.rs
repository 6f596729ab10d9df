//! Archive of published lines, kept as a trimmed Redis list.

use lain_core::BroadcastMessage;
use redis::AsyncCommands;
use tracing::warn;

use super::KEY_PREFIX;
use crate::client::{RedisPool, RedisResult};

/// Number of archived lines kept.
pub const ARCHIVE_LEN: usize = 1_000;

pub fn archive_key() -> String {
    format!("{}:broadcasts", KEY_PREFIX)
}

/// Push a published line onto the archive, trimming the oldest.
pub async fn archive_broadcast(pool: &RedisPool, message: &BroadcastMessage) -> RedisResult<()> {
    let json = serde_json::to_string(message)?;
    let mut conn = pool.clone();

    let key = archive_key();
    conn.lpush::<_, _, ()>(&key, &json).await?;
    conn.ltrim::<_, ()>(&key, 0, ARCHIVE_LEN as isize - 1).await?;

    Ok(())
}

/// Most recent archived lines, newest first.
pub async fn recent_broadcasts(pool: &RedisPool, limit: usize) -> RedisResult<Vec<BroadcastMessage>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut conn = pool.clone();
    let rows: Vec<String> = conn.lrange(archive_key(), 0, limit as isize - 1).await?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_str(&row) {
            Ok(message) => messages.push(message),
            Err(e) => warn!(error = %e, "Skipping malformed archived broadcast"),
        }
    }
    Ok(messages)
}
