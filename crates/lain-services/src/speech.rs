//! Speech synthesis client.
//!
//! The TTS service answers `/synthesize` with a base64-encoded WAV clip.

use async_trait::async_trait;
use base64::Engine;
use lain_core::{LainError, LainResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::request_error;

/// Default speech service URL.
pub const DEFAULT_SPEECH_URL: &str = "http://127.0.0.1:8002";

/// A synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub speed: f32,
}

/// Audio-synthesis service.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Synthesize `request.text`, returning the encoded audio clip.
    async fn synthesize(&self, request: &SpeechRequest) -> LainResult<Vec<u8>>;
}

#[derive(Serialize)]
struct SynthesizeBody<'a> {
    text: &'a str,
    speaker: &'a str,
    speed: f32,
}

#[derive(Deserialize)]
struct SynthesizeReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

/// HTTP client for the TTS service.
#[derive(Clone)]
pub struct HttpSpeechClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSpeechClient {
    /// Create a client for `base_url` whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        }
    }
}

#[async_trait]
impl SpeechClient for HttpSpeechClient {
    async fn synthesize(&self, request: &SpeechRequest) -> LainResult<Vec<u8>> {
        let body = SynthesizeBody {
            text: &request.text,
            speaker: &request.voice_id,
            speed: request.speed,
        };

        let response = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("speech", self.timeout, e, LainError::Synthesis))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LainError::Synthesis(format!(
                "Speech API error ({}): {}",
                status, body
            )));
        }

        let reply: SynthesizeReply = response
            .json()
            .await
            .map_err(|e| request_error("speech", self.timeout, e, LainError::Synthesis))?;

        if !reply.success {
            return Err(LainError::Synthesis("speech service reported failure".to_string()));
        }

        let encoded = reply
            .audio
            .ok_or_else(|| LainError::Synthesis("speech reply carried no audio".to_string()))?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| LainError::Synthesis(format!("invalid audio payload: {}", e)))?;

        debug!(
            bytes = audio.len(),
            format = reply.format.as_deref().unwrap_or("wav"),
            "Synthesized speech"
        );
        Ok(audio)
    }
}
