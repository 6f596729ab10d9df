//! Query modules for the data Lain.TV keeps in Redis.

pub mod broadcasts;
pub mod chat;

/// Prefix shared by every key this crate writes.
pub const KEY_PREFIX: &str = "lain";
