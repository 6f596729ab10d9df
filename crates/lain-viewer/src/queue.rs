//! Speech playback queue.
//!
//! Lines are spoken strictly in arrival order by a single worker task that
//! exists only while there is something to say. Each item is synthesized,
//! played to completion, and followed by a short pause when more items are
//! waiting. A failed item is logged and skipped.

use lain_core::config::SpeechConfig;
use lain_services::{SpeechClient, SpeechRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::sink::AudioSink;

pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);

/// What the speaker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingState {
    Idle,
    Synthesizing,
    Playing,
}

/// Voice parameters sent with every synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub voice_id: String,
    pub speed: f32,
}

impl From<&SpeechConfig> for Voice {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            voice_id: config.voice_id.clone(),
            speed: config.speed,
        }
    }
}

struct Inner {
    pending: Mutex<VecDeque<String>>,
    running: AtomicBool,
    speech: Arc<dyn SpeechClient>,
    sink: Arc<dyn AudioSink>,
    voice: Voice,
    pause: Duration,
    synthesis_timeout: Duration,
    state: watch::Sender<SpeakingState>,
}

/// FIFO of lines to speak. Cheap to clone; clones share the queue.
#[derive(Clone)]
pub struct PlaybackQueue {
    inner: Arc<Inner>,
}

impl PlaybackQueue {
    pub fn new(
        speech: Arc<dyn SpeechClient>,
        sink: Arc<dyn AudioSink>,
        voice: Voice,
        pause: Duration,
        synthesis_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SpeakingState::Idle);
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(VecDeque::new()),
                running: AtomicBool::new(false),
                speech,
                sink,
                voice,
                pause,
                synthesis_timeout,
                state,
            }),
        }
    }

    /// Append `text` and start the worker if it is not running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue(&self, text: impl Into<String>) {
        let text = text.into();
        debug!(chars = text.chars().count(), "Queued line for speech");
        self.inner.pending.lock().push_back(text);
        if self.inner.claim_worker() {
            tokio::spawn(Inner::drain(Arc::clone(&self.inner)));
        }
    }

    /// Items waiting behind the one being spoken.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn state(&self) -> SpeakingState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SpeakingState> {
        self.inner.state.subscribe()
    }

    /// Nothing queued and no worker running.
    pub fn is_idle(&self) -> bool {
        !self.inner.running.load(Ordering::SeqCst) && self.pending_len() == 0
    }

    /// Resolve once every queued line has been handled.
    pub async fn wait_idle(&self) {
        let mut changes = self.subscribe_state();
        while !self.is_idle() {
            if changes.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Inner {
    fn claim_worker(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn pop(&self) -> Option<String> {
        self.pending.lock().pop_front()
    }

    fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    async fn drain(self: Arc<Self>) {
        loop {
            while let Some(text) = self.pop() {
                self.speak(text).await;
                if self.has_pending() {
                    tokio::time::sleep(self.pause).await;
                }
            }

            self.running.store(false, Ordering::SeqCst);
            self.state.send_replace(SpeakingState::Idle);

            // An item may have landed between the last pop and the release.
            if !self.has_pending() || !self.claim_worker() {
                break;
            }
        }
    }

    async fn speak(&self, text: String) {
        self.state.send_replace(SpeakingState::Synthesizing);
        let request = SpeechRequest {
            text,
            voice_id: self.voice.voice_id.clone(),
            speed: self.voice.speed,
        };

        let audio = match tokio::time::timeout(self.synthesis_timeout, self.speech.synthesize(&request)).await {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => {
                warn!(error = %e, "Speech synthesis failed, skipping line");
                self.state.send_replace(SpeakingState::Idle);
                return;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.synthesis_timeout.as_millis() as u64,
                    "Speech synthesis timed out, skipping line"
                );
                self.state.send_replace(SpeakingState::Idle);
                return;
            }
        };

        self.state.send_replace(SpeakingState::Playing);
        if let Err(e) = self.sink.play(audio).await {
            warn!(error = %e, "Playback failed, skipping line");
        }
        self.state.send_replace(SpeakingState::Idle);
    }
}
