//! Text-generation client.
//!
//! Talks to the LainLLM service's `/generate` endpoint, which answers with a
//! line of dialogue plus a mood and an animation hint.

use async_trait::async_trait;
use lain_core::{LainError, LainResult, Mood};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::request_error;

/// Default inference service URL.
pub const DEFAULT_INFERENCE_URL: &str = "http://127.0.0.1:8001";

/// Animation used when the service does not name one.
const DEFAULT_ANIMATION: &str = "talk";

/// One prior exchange handed to the service as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTurn {
    pub role: String,
    pub content: String,
}

impl ContextTurn {
    /// A line Lain spoke in an earlier broadcast.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub prompt: String,
    pub session_context: Option<Vec<ContextTurn>>,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_context: None,
        }
    }

    /// Attach prior turns, oldest first. An empty list sends no context.
    pub fn with_context(mut self, turns: Vec<ContextTurn>) -> Self {
        self.session_context = (!turns.is_empty()).then_some(turns);
        self
    }
}

/// A generated line.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub mood: Mood,
    pub animation_hint: String,
    pub should_speak: bool,
}

/// Text-generation service.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generate one line for `request`.
    async fn generate(&self, request: &InferenceRequest) -> LainResult<Generation>;

    /// Whether the service answers at all.
    async fn health_check(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    message: &'a str,
    principal_id: Option<&'a str>,
    context: Option<&'a [ContextTurn]>,
    include_memory: bool,
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
    #[serde(default)]
    animation: Option<String>,
    #[serde(default)]
    mood: Option<String>,
    #[serde(default)]
    should_speak: Option<bool>,
}

impl From<GenerateReply> for Generation {
    fn from(reply: GenerateReply) -> Self {
        Self {
            text: reply.response.trim().to_string(),
            mood: reply.mood.as_deref().map(Mood::from_str).unwrap_or_default(),
            animation_hint: reply
                .animation
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ANIMATION.to_string()),
            should_speak: reply.should_speak.unwrap_or(true),
        }
    }
}

/// HTTP client for the LainLLM service.
#[derive(Clone)]
pub struct HttpInferenceClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpInferenceClient {
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

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn generate(&self, request: &InferenceRequest) -> LainResult<Generation> {
        let body = GenerateBody {
            message: &request.prompt,
            principal_id: None,
            context: request.session_context.as_deref(),
            include_memory: false,
        };

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("inference", self.timeout, e, LainError::Generation))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LainError::Generation(format!(
                "Inference API error ({}): {}",
                status, body
            )));
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| request_error("inference", self.timeout, e, LainError::Generation))?;

        let generation = Generation::from(reply);
        debug!(
            mood = generation.mood.as_str(),
            animation = %generation.animation_hint,
            chars = generation.text.len(),
            "Generated line"
        );
        Ok(generation)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
