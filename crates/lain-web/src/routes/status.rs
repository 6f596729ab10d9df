//! Status and health route handlers.

use axum::{extract::State, Json};
use lain_core::StatusReport;
use serde::Serialize;

use crate::state::AppState;

/// Liveness plus reachability of the inference service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub inference_reachable: bool,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    let sessions = state.registry.session_count().await;
    Json(state.broadcast_state().status(sessions))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        inference_reachable: state.inference.health_check().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use lain_broadcast::{BroadcastState, Session, SessionRegistry};
    use lain_core::{BroadcastMessage, LainError, LainResult, Mood};
    use lain_redis::MemoryStore;
    use lain_services::{CannedInferenceClient, Generation, InferenceClient, InferenceRequest};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Unreachable;

    #[async_trait]
    impl InferenceClient for Unreachable {
        async fn generate(&self, _request: &InferenceRequest) -> LainResult<Generation> {
            Err(LainError::Generation("down".into()))
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    fn app_state(inference: Arc<dyn InferenceClient>) -> AppState {
        let registry = Arc::new(SessionRegistry::new(Arc::new(BroadcastState::new(10))));
        AppState::new(registry, inference, Arc::new(MemoryStore::default()), 8)
    }

    async fn get_json(state: AppState, uri: &str) -> Value {
        let response = create_router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_status_before_first_broadcast() {
        let state = app_state(Arc::new(CannedInferenceClient::new()));
        let json = get_json(state, "/status").await;
        assert_eq!(json["activeSessionCount"], 0);
        assert_eq!(json["generating"], false);
        assert!(json["lastBroadcastAt"].is_null());
    }

    #[tokio::test]
    async fn test_status_counts_sessions_and_reports_generation() {
        let state = app_state(Arc::new(CannedInferenceClient::new()));
        let (a, _rx_a) = Session::with_id("a", 4);
        let (b, _rx_b) = Session::with_id("b", 4);
        state.registry.register(a).await.unwrap();
        state.registry.register(b).await.unwrap();

        let message = BroadcastMessage::new(1, "hello", Mood::Curious, "talk").unwrap();
        state.broadcast_state().publish(message);
        let _guard = state.broadcast_state().try_begin_generation().unwrap();

        let json = get_json(state, "/status").await;
        assert_eq!(json["activeSessionCount"], 2);
        assert_eq!(json["generating"], true);
        assert!(json["lastBroadcastAt"].is_string());
    }

    #[tokio::test]
    async fn test_health_reports_inference_reachability() {
        let json = get_json(app_state(Arc::new(CannedInferenceClient::new())), "/health").await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["inferenceReachable"], true);

        let json = get_json(app_state(Arc::new(Unreachable)), "/health").await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["inferenceReachable"], false);
    }
}
