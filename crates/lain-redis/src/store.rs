//! Storage seams used by the relay.

use async_trait::async_trait;
use lain_core::chat::model::ChatEntry;
use lain_core::{BroadcastMessage, LainResult};
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::client::RedisPool;
use crate::queries::{broadcasts, chat};

/// Where viewer chat goes.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append_chat(&self, entry: &ChatEntry) -> LainResult<()>;

    /// Most recent chat lines, newest first.
    async fn recent_chat(&self, limit: usize) -> LainResult<Vec<ChatEntry>>;
}

/// Where published lines are archived.
#[async_trait]
pub trait BroadcastArchive: Send + Sync {
    async fn archive(&self, message: &BroadcastMessage) -> LainResult<()>;

    /// Most recent archived lines, newest first.
    async fn recent(&self, limit: usize) -> LainResult<Vec<BroadcastMessage>>;
}

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisStore {
    pool: RedisPool,
}

impl RedisStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for RedisStore {
    async fn append_chat(&self, entry: &ChatEntry) -> LainResult<()> {
        Ok(chat::append_chat(&self.pool, entry).await?)
    }

    async fn recent_chat(&self, limit: usize) -> LainResult<Vec<ChatEntry>> {
        Ok(chat::recent_chat(&self.pool, limit).await?)
    }
}

#[async_trait]
impl BroadcastArchive for RedisStore {
    async fn archive(&self, message: &BroadcastMessage) -> LainResult<()> {
        Ok(broadcasts::archive_broadcast(&self.pool, message).await?)
    }

    async fn recent(&self, limit: usize) -> LainResult<Vec<BroadcastMessage>> {
        Ok(broadcasts::recent_broadcasts(&self.pool, limit).await?)
    }
}

/// Bounded in-process store, used when no Redis URL is configured.
pub struct MemoryStore {
    capacity: usize,
    chat: Mutex<VecDeque<ChatEntry>>,
    broadcasts: Mutex<VecDeque<BroadcastMessage>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            chat: Mutex::new(VecDeque::new()),
            broadcasts: Mutex::new(VecDeque::new()),
        }
    }

    fn push<T>(buf: &Mutex<VecDeque<T>>, capacity: usize, item: T) {
        let mut buf = buf.lock();
        if buf.len() == capacity {
            buf.pop_front();
        }
        buf.push_back(item);
    }

    fn newest<T: Clone>(buf: &Mutex<VecDeque<T>>, limit: usize) -> Vec<T> {
        buf.lock().iter().rev().take(limit).cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(broadcasts::ARCHIVE_LEN)
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn append_chat(&self, entry: &ChatEntry) -> LainResult<()> {
        Self::push(&self.chat, self.capacity, entry.clone());
        Ok(())
    }

    async fn recent_chat(&self, limit: usize) -> LainResult<Vec<ChatEntry>> {
        Ok(Self::newest(&self.chat, limit))
    }
}

#[async_trait]
impl BroadcastArchive for MemoryStore {
    async fn archive(&self, message: &BroadcastMessage) -> LainResult<()> {
        Self::push(&self.broadcasts, self.capacity, message.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> LainResult<Vec<BroadcastMessage>> {
        Ok(Self::newest(&self.broadcasts, limit))
    }
}
