//! Lain.TV Web Server
//!
//! Axum-based relay: the `/ws` endpoint every viewer connects to, plus a
//! small JSON status surface.

pub mod routes;
pub mod state;
pub mod websocket;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/status", get(routes::status::status))
        .route("/health", get(routes::status::health))
        .route("/history", get(routes::broadcasts::history))
        .route("/current", get(routes::broadcasts::current))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the web server until `shutdown` is cancelled.
pub async fn run_server(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("Lain.TV relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}
