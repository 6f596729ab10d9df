//! Lain.TV Redis Data Layer
//!
//! Stores viewer chat (telemetry only) and an archive of published lines.
//! The relay talks to storage through the traits in [`store`], so it runs
//! unchanged against Redis or the in-memory fallback.

pub mod client;
pub mod queries;
pub mod store;

pub use client::{init_pool, RedisError, RedisPool, RedisResult};
pub use queries::broadcasts;
pub use queries::chat;
pub use store::{BroadcastArchive, ChatStore, MemoryStore, RedisStore};
