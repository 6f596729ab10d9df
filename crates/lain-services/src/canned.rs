//! Offline inference.
//!
//! Answers from a fixed table keyed on prompt keywords, for running the relay
//! without a model behind it.

use async_trait::async_trait;
use lain_core::{LainResult, Mood};

use crate::inference::{Generation, InferenceClient, InferenceRequest};

struct CannedLine {
    keywords: &'static [&'static str],
    text: &'static str,
    mood: Mood,
    animation: &'static str,
}

const LINES: &[CannedLine] = &[
    CannedLine {
        keywords: &["wired", "network", "internet"],
        text: "the boundaries between networks dissolve... we're all connected.",
        mood: Mood::Curious,
        animation: "think",
    },
    CannedLine {
        keywords: &["protocol", "crypto", "decentral"],
        text: "protocols define reality... consensus creates truth.",
        mood: Mood::Neutral,
        animation: "type",
    },
    CannedLine {
        keywords: &["exist", "real", "identity", "data"],
        text: "what is real? the network persists... does that make it more real than flesh?",
        mood: Mood::Melancholic,
        animation: "look_away",
    },
    CannedLine {
        keywords: &["lonel", "connection"],
        text: "everyone is connected... so why does it feel so quiet here?",
        mood: Mood::Distant,
        animation: "look_away",
    },
    CannedLine {
        keywords: &["?", "ask", "question"],
        text: "questions create pathways through data... what truth do you seek?",
        mood: Mood::Cryptic,
        animation: "talk",
    },
    CannedLine {
        keywords: &["people", "viewer", "listening"],
        text: "present day... present time. the network recognizes you.",
        mood: Mood::Neutral,
        animation: "wave",
    },
];

static FALLBACK: CannedLine = CannedLine {
    keywords: &[],
    text: "i'm listening... through layers of the Wired.",
    mood: Mood::Neutral,
    animation: "idle",
};

/// Inference client that never leaves the process.
#[derive(Debug, Clone, Default)]
pub struct CannedInferenceClient;

impl CannedInferenceClient {
    pub fn new() -> Self {
        Self
    }

    fn pick(prompt: &str) -> &'static CannedLine {
        let prompt = prompt.to_lowercase();
        LINES
            .iter()
            .find(|line| line.keywords.iter().any(|kw| prompt.contains(kw)))
            .unwrap_or(&FALLBACK)
    }
}

#[async_trait]
impl InferenceClient for CannedInferenceClient {
    async fn generate(&self, request: &InferenceRequest) -> LainResult<Generation> {
        let line = Self::pick(&request.prompt);
        Ok(Generation {
            text: line.text.to_string(),
            mood: line.mood,
            animation_hint: line.animation.to_string(),
            should_speak: true,
        })
    }
}
