//! Broadcast Scheduler.
//!
//! Asks the inference service for a new line at irregular intervals and
//! publishes it. At most one generation is ever in flight: a tick that finds
//! one running is dropped, not queued. Failures are logged and swallowed so
//! the loop never dies.

use lain_core::config::BroadcastConfig;
use lain_core::prompts::default_prompts;
use lain_core::BroadcastMessage;
use lain_redis::BroadcastArchive;
use lain_services::{ContextTurn, InferenceClient, InferenceRequest};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::registry::SessionRegistry;
use crate::state::BroadcastState;

/// Recent lines handed back to the model so it does not repeat itself.
const CONTEXT_TURNS: usize = 3;

/// Random delay between ticks, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    min: Duration,
    max: Duration,
}

impl Cadence {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Same delay every cycle.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    pub fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min == max {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Round-robin over a fixed prompt set.
pub struct PromptRotation {
    prompts: Vec<String>,
    next: AtomicUsize,
}

impl PromptRotation {
    /// Blank prompts are dropped; an empty set falls back to the defaults.
    pub fn new(prompts: Vec<String>) -> Self {
        let mut prompts: Vec<String> = prompts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if prompts.is_empty() {
            prompts = default_prompts();
        }
        Self {
            prompts,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.prompts.len();
        &self.prompts[i]
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A generation was already in flight.
    Skipped,
    /// A new line was published with this sequence id.
    Published(u64),
    /// Inference failed or timed out; nothing was published.
    Failed,
}

/// Timer-driven producer of broadcast lines.
pub struct Scheduler {
    state: Arc<BroadcastState>,
    registry: Arc<SessionRegistry>,
    inference: Arc<dyn InferenceClient>,
    archive: Option<Arc<dyn BroadcastArchive>>,
    prompts: PromptRotation,
    cadence: Cadence,
    warmup: Duration,
    inference_timeout: Duration,
}

impl Scheduler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        inference: Arc<dyn InferenceClient>,
        config: &BroadcastConfig,
        inference_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::clone(registry.state()),
            registry,
            inference,
            archive: None,
            prompts: PromptRotation::new(config.prompts.clone()),
            cadence: Cadence::new(config.min_interval(), config.max_interval()),
            warmup: config.warmup(),
            inference_timeout,
        }
    }

    /// Also archive every published line.
    pub fn with_archive(mut self, archive: Arc<dyn BroadcastArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn state(&self) -> &Arc<BroadcastState> {
        &self.state
    }

    /// Run one generation cycle.
    pub async fn tick(&self) -> TickOutcome {
        let Some(guard) = self.state.try_begin_generation() else {
            debug!("Generation already in flight, skipping tick");
            return TickOutcome::Skipped;
        };

        let context: Vec<ContextTurn> = self
            .state
            .history()
            .recent(CONTEXT_TURNS)
            .into_iter()
            .rev()
            .map(|message| ContextTurn::assistant(message.text))
            .collect();
        let context_turns = context.len();
        let request = InferenceRequest::new(self.prompts.next()).with_context(context);
        debug!(prompt = %request.prompt, context_turns, "Requesting broadcast line");

        let generation =
            match tokio::time::timeout(self.inference_timeout, self.inference.generate(&request)).await {
                Ok(Ok(generation)) => generation,
                Ok(Err(e)) => {
                    warn!(error = %e, "Generation failed, skipping this broadcast");
                    return TickOutcome::Failed;
                }
                Err(_) => {
                    warn!(
                        timeout_ms = self.inference_timeout.as_millis() as u64,
                        "Generation timed out, skipping this broadcast"
                    );
                    return TickOutcome::Failed;
                }
            };

        if generation.text.trim().is_empty() {
            warn!("Generation returned an empty line, skipping this broadcast");
            return TickOutcome::Failed;
        }

        let message = match BroadcastMessage::new(
            self.state.next_sequence_id(),
            &generation.text,
            generation.mood,
            &generation.animation_hint,
        ) {
            Ok(message) => message.with_speech(generation.should_speak),
            Err(e) => {
                warn!(error = %e, "Rejected generated line");
                return TickOutcome::Failed;
            }
        };
        let sequence_id = message.sequence_id;

        self.state.publish(message.clone());
        self.state.history().push(message.clone());
        let report = self.registry.broadcast(&message).await;
        drop(guard);

        info!(
            sequence_id,
            mood = message.mood.as_str(),
            delivered = report.delivered,
            "Broadcast published"
        );

        if let Some(archive) = &self.archive {
            if let Err(e) = archive.archive(&message).await {
                warn!(sequence_id, error = %e, "Failed to archive broadcast");
            }
        }

        TickOutcome::Published(sequence_id)
    }

    /// Tick after the warm-up, then again after every random delay, until
    /// `cancel` fires.
    ///
    /// Each tick runs on its own task, so the cadence holds while a slow
    /// generation is in flight; overlapping ticks are skipped by the guard.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            warmup_ms = self.warmup.as_millis() as u64,
            min_ms = self.cadence.min.as_millis() as u64,
            max_ms = self.cadence.max.as_millis() as u64,
            prompts = self.prompts.len(),
            "Broadcast scheduler started"
        );

        let tracker = TaskTracker::new();

        let warmed_up = tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.warmup) => true,
        };

        if warmed_up {
            loop {
                let scheduler = Arc::clone(&self);
                let tick_cancel = cancel.clone();
                tracker.spawn(async move {
                    tokio::select! {
                        _ = tick_cancel.cancelled() => {}
                        outcome = scheduler.tick() => debug!(?outcome, "Tick finished"),
                    }
                });

                let delay = self.cadence.next_delay();
                debug!(delay_ms = delay.as_millis() as u64, "Next tick scheduled");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracker.close();
        tracker.wait().await;
        info!("Broadcast scheduler stopped");
    }

    /// Spawn [`Scheduler::run`] on the runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lain_core::{LainError, LainResult, Mood, ServerMessage};
    use lain_redis::MemoryStore;
    use lain_services::Generation;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    enum Step {
        Line(&'static str),
        Fail,
        Hang,
    }

    /// Scripted inference. Once the script runs out every call succeeds.
    struct FakeInference {
        script: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        contexts: Mutex<Vec<Option<Vec<ContextTurn>>>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeInference {
        fn new(script: Vec<Step>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                contexts: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(Vec::new())
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceClient for FakeInference {
        async fn generate(&self, request: &InferenceRequest) -> LainResult<Generation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().push(request.prompt.clone());
            self.contexts.lock().push(request.session_context.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let step = self.script.lock().pop_front();
            let text = match step {
                Some(Step::Line(text)) => text,
                Some(Step::Fail) => return Err(LainError::Generation("model offline".into())),
                Some(Step::Hang) => std::future::pending().await,
                None => "i'm listening... through layers of the Wired.",
            };
            Ok(Generation {
                text: text.to_string(),
                mood: Mood::Cryptic,
                animation_hint: "talk".to_string(),
                should_speak: true,
            })
        }
    }

    fn config() -> BroadcastConfig {
        BroadcastConfig {
            warmup_secs: 5,
            min_interval_secs: 15,
            max_interval_secs: 30,
            history_capacity: 3,
            session_buffer: 16,
            prompts: vec!["first".into(), "second".into()],
        }
    }

    fn build(inference: Arc<FakeInference>) -> Scheduler {
        let state = Arc::new(BroadcastState::new(3));
        let registry = Arc::new(SessionRegistry::new(state));
        Scheduler::new(registry, inference, &config(), Duration::from_secs(5))
    }

    fn scheduler(inference: Arc<FakeInference>) -> Arc<Scheduler> {
        Arc::new(build(inference))
    }

    #[tokio::test]
    async fn test_tick_with_no_sessions_publishes() {
        let inference = Arc::new(FakeInference::new(vec![Step::Line("the Wired is quiet tonight")]));
        let scheduler = scheduler(Arc::clone(&inference));

        assert_eq!(scheduler.tick().await, TickOutcome::Published(1));

        let state = scheduler.state();
        let current = state.current().unwrap();
        assert_eq!(current.text, "the Wired is quiet tonight");
        assert_eq!(current.mood, Mood::Cryptic);
        assert!(state.last_broadcast_at().is_some());
        assert!(!state.is_generating());
        assert_eq!(scheduler.registry.session_count().await, 0);
        assert_eq!(state.status(0).active_session_count, 0);
    }

    #[tokio::test]
    async fn test_at_most_one_generation_in_flight() {
        let gate = Arc::new(Notify::new());
        let inference = Arc::new(FakeInference::gated(Arc::clone(&gate)));
        let scheduler = scheduler(Arc::clone(&inference));

        let first = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.tick().await })
        };
        while inference.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(scheduler.state().is_generating());

        for _ in 0..5 {
            assert_eq!(scheduler.tick().await, TickOutcome::Skipped);
        }
        assert_eq!(inference.calls(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), TickOutcome::Published(1));
        assert!(!scheduler.state().is_generating());
    }

    #[tokio::test]
    async fn test_failure_is_swallowed_and_flag_cleared() {
        let inference = Arc::new(FakeInference::new(vec![Step::Fail, Step::Line("back online")]));
        let scheduler = scheduler(Arc::clone(&inference));

        assert_eq!(scheduler.tick().await, TickOutcome::Failed);
        assert!(!scheduler.state().is_generating());
        assert!(scheduler.state().current().is_none());

        assert_eq!(scheduler.tick().await, TickOutcome::Published(1));
        assert_eq!(scheduler.state().current().unwrap().text, "back online");
    }

    #[tokio::test]
    async fn test_blank_line_is_not_published() {
        let inference = Arc::new(FakeInference::new(vec![Step::Line("   ")]));
        let scheduler = scheduler(inference);

        assert_eq!(scheduler.tick().await, TickOutcome::Failed);
        assert!(scheduler.state().current().is_none());
        assert!(scheduler.state().history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_previous_state() {
        let inference = Arc::new(FakeInference::new(vec![Step::Line("before"), Step::Hang]));
        let scheduler = scheduler(Arc::clone(&inference));

        assert_eq!(scheduler.tick().await, TickOutcome::Published(1));
        let before = scheduler.state().current().unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(scheduler.tick().await, TickOutcome::Failed);
        assert!(started.elapsed() >= Duration::from_secs(5));

        let status = scheduler.state().status(0);
        assert!(!status.generating);
        assert_eq!(scheduler.state().current(), Some(before));

        assert_eq!(scheduler.tick().await, TickOutcome::Published(2));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let inference = Arc::new(FakeInference::new(Vec::new()));
        let scheduler = scheduler(inference);

        for _ in 0..5 {
            scheduler.tick().await;
        }
        let ids: Vec<_> = scheduler
            .state()
            .history()
            .recent(10)
            .iter()
            .map(|m| m.sequence_id)
            .collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn test_prompts_rotate() {
        let inference = Arc::new(FakeInference::new(Vec::new()));
        let scheduler = scheduler(Arc::clone(&inference));

        for _ in 0..3 {
            scheduler.tick().await;
        }
        assert_eq!(*inference.prompts.lock(), vec!["first", "second", "first"]);
    }

    #[tokio::test]
    async fn test_recent_lines_are_sent_as_context() {
        let inference = Arc::new(FakeInference::new(vec![
            Step::Line("one"),
            Step::Line("two"),
            Step::Fail,
            Step::Line("three"),
            Step::Line("four"),
            Step::Line("five"),
        ]));
        let scheduler = scheduler(Arc::clone(&inference));

        for _ in 0..6 {
            scheduler.tick().await;
        }

        let said = |lines: &[&str]| {
            Some(lines.iter().map(|l| ContextTurn::assistant(*l)).collect::<Vec<_>>())
        };
        let contexts = inference.contexts.lock().clone();
        assert_eq!(contexts.len(), 6);
        assert_eq!(contexts[0], None);
        assert_eq!(contexts[1], said(&["one"]));
        // A failed generation adds nothing
        assert_eq!(contexts[2], said(&["one", "two"]));
        assert_eq!(contexts[3], said(&["one", "two"]));
        // Oldest first, capped at the most recent lines
        assert_eq!(contexts[5], said(&["two", "three", "four"]));
    }

    #[tokio::test]
    async fn test_published_lines_are_archived() {
        let inference = Arc::new(FakeInference::new(vec![Step::Line("keep this")]));
        let archive = Arc::new(MemoryStore::new(10));
        let scheduler = build(inference).with_archive(archive.clone());

        scheduler.tick().await;
        let archived = archive.recent(5).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].text, "keep this");
    }

    #[tokio::test]
    async fn test_tick_fans_out_to_sessions() {
        let inference = Arc::new(FakeInference::new(vec![Step::Line("to everyone")]));
        let scheduler = scheduler(inference);
        let (session, mut rx) = crate::Session::with_id("viewer", 8);
        scheduler.registry.register(session).await.unwrap();
        rx.try_recv().unwrap();

        scheduler.tick().await;
        match ServerMessage::from_json(&rx.try_recv().unwrap()).unwrap() {
            ServerMessage::Broadcast(msg) => assert_eq!(msg.text, "to everyone"),
            other => panic!("expected broadcast, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_for_warmup_then_follows_cadence() {
        let inference = Arc::new(FakeInference::new(Vec::new()));
        let scheduler = Arc::new(
            build(Arc::clone(&inference))
                .with_warmup(Duration::from_secs(5))
                .with_cadence(Cadence::fixed(Duration::from_secs(10))),
        );
        let cancel = CancellationToken::new();
        let handle = Arc::clone(&scheduler).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(inference.calls(), 0);

        // Ticks at 5s, 15s and 25s.
        tokio::time::sleep(Duration::from_secs(22)).await;
        assert_eq!(inference.calls(), 3);

        cancel.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(inference.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_timeouts() {
        let inference = Arc::new(FakeInference::new(vec![Step::Hang, Step::Line("recovered")]));
        let scheduler = Arc::new(
            build(Arc::clone(&inference))
                .with_warmup(Duration::from_secs(1))
                .with_cadence(Cadence::fixed(Duration::from_secs(10))),
        );
        let cancel = CancellationToken::new();
        let handle = Arc::clone(&scheduler).spawn(cancel.clone());

        // First tick at 1s hangs until its 5s timeout; second tick at 11s succeeds.
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(!scheduler.state().is_generating());
        assert!(scheduler.state().current().is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(scheduler.state().current().unwrap().text, "recovered");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_during_warmup() {
        let inference = Arc::new(FakeInference::new(Vec::new()));
        let scheduler = scheduler(Arc::clone(&inference));
        let cancel = CancellationToken::new();
        cancel.cancel();
        scheduler.run(cancel).await;
        assert_eq!(inference.calls(), 0);
    }

    #[test]
    fn test_cadence_within_range() {
        let cadence = Cadence::new(Duration::from_secs(15), Duration::from_secs(30));
        for _ in 0..1000 {
            let delay = cadence.next_delay();
            assert!(delay >= Duration::from_secs(15) && delay <= Duration::from_secs(30));
        }
    }

    #[test]
    fn test_cadence_fixed_and_inverted() {
        assert_eq!(Cadence::fixed(Duration::from_secs(3)).next_delay(), Duration::from_secs(3));
        let cadence = Cadence::new(Duration::from_secs(9), Duration::from_secs(2));
        let delay = cadence.next_delay();
        assert!(delay >= Duration::from_secs(2) && delay <= Duration::from_secs(9));
    }

    #[test]
    fn test_prompt_rotation_drops_blanks() {
        let rotation = PromptRotation::new(vec!["  ".into(), "a".into()]);
        assert_eq!(rotation.len(), 1);
        assert_eq!(rotation.next(), "a");
        assert_eq!(rotation.next(), "a");

        let fallback = PromptRotation::new(Vec::new());
        assert_eq!(fallback.len(), lain_core::prompts::DEFAULT_PROMPTS.len());
    }
}
