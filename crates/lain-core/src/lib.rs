//! Lain.TV Core Library
//!
//! Domain models, wire envelopes, configuration and errors shared by the
//! broadcast relay and its viewers.

pub mod chat;
pub mod config;
pub mod error;
pub mod message;
pub mod prompts;

pub use config::LainConfig;
pub use error::{LainError, LainResult};
pub use message::model::{BroadcastMessage, Mood, StatusReport, SyncPayload};
pub use message::{ClientMessage, ServerMessage};
