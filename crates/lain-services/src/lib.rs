//! # Lain.TV Services
//!
//! Clients for the external collaborators of the relay: the text-generation
//! service that writes Lain's lines and the speech service that voices them.
//!
//! Both are exposed as traits so the scheduler and the playback queue can be
//! wired with fakes in tests.

pub mod canned;
pub mod inference;
pub mod speech;

pub use canned::CannedInferenceClient;
pub use inference::{ContextTurn, Generation, HttpInferenceClient, InferenceClient, InferenceRequest};
pub use speech::{HttpSpeechClient, SpeechClient, SpeechRequest};

/// Map a reqwest failure onto the relay's error type.
pub(crate) fn request_error(
    operation: &'static str,
    timeout: std::time::Duration,
    err: reqwest::Error,
    wrap: fn(String) -> lain_core::LainError,
) -> lain_core::LainError {
    if err.is_timeout() {
        lain_core::LainError::timeout(operation, timeout)
    } else {
        wrap(format!("Failed to reach {} service: {}", operation, err))
    }
}
