//! Centralized error types for Lain.TV.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Lain.TV operations.
#[derive(Error, Debug)]
pub enum LainError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio playback failed: {0}")]
    Playback(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Lain.TV operations.
pub type LainResult<T> = Result<T, LainError>;

impl LainError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    /// Whether this error came from an elapsed deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
