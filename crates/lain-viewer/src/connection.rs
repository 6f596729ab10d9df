//! Relay connection with reconnect.

use futures::StreamExt;
use lain_core::{LainError, LainResult, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::viewer::Viewer;

/// Follow the relay at `url` until `cancel` fires, reconnecting after
/// `reconnect_delay` whenever the connection drops.
pub async fn watch(
    url: &str,
    viewer: Arc<Viewer>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = follow(url, &viewer) => result,
        };

        match result {
            Ok(()) => info!(url, "Relay closed the connection"),
            Err(e) => warn!(url, error = %e, "Relay connection failed"),
        }

        debug!(delay_ms = reconnect_delay.as_millis() as u64, "Reconnecting");
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
    info!("Viewer stopped");
}

/// One connection: apply envelopes until the stream ends.
async fn follow(url: &str, viewer: &Viewer) -> LainResult<()> {
    let (mut stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| LainError::Transport(format!("failed to connect to {}: {}", url, e)))?;
    info!(url, "Connected to relay");

    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| LainError::Transport(e.to_string()))?;
        match frame {
            Message::Text(text) => match ServerMessage::from_json(text.as_str()) {
                Ok(message) => {
                    let event = viewer.apply(message);
                    debug!(?event, "Applied relay message");
                }
                Err(e) => warn!(error = %e, "Skipping malformed relay frame"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::Caption;
    use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
    use axum::{routing::get, Router};
    use lain_core::{BroadcastMessage, Mood, SyncPayload};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Screen {
        shown: Mutex<Vec<u64>>,
    }

    impl Caption for Screen {
        fn show(&self, message: &BroadcastMessage) {
            self.shown.lock().push(message.sequence_id);
        }
    }

    fn frame(message: ServerMessage) -> WsMessage {
        WsMessage::Text(message.to_json().unwrap().into())
    }

    /// Relay that sends a sync, a line twice and some garbage, then hangs up.
    async fn flaky_relay(connections: Arc<AtomicUsize>) -> String {
        let app = Router::new().route(
            "/ws",
            get(move |ws: WebSocketUpgrade| {
                let connections = Arc::clone(&connections);
                async move {
                    ws.on_upgrade(move |mut socket| async move {
                        let n = connections.fetch_add(1, Ordering::SeqCst) as u64;
                        let current = BroadcastMessage::new(1, "hello", Mood::Neutral, "idle").unwrap();
                        let next =
                            BroadcastMessage::new(2 + n, "again", Mood::Cryptic, "talk").unwrap();
                        let _ = socket
                            .send(frame(ServerMessage::Sync(SyncPayload {
                                current: Some(current),
                                generating: false,
                                last_broadcast_at: None,
                            })))
                            .await;
                        let _ = socket.send(WsMessage::Text("{oops".into())).await;
                        let _ = socket.send(frame(ServerMessage::Broadcast(next.clone()))).await;
                        let _ = socket.send(frame(ServerMessage::Broadcast(next))).await;
                        let _ = socket.send(WsMessage::Close(None)).await;
                    })
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("ws://{}/ws", addr)
    }

    #[tokio::test]
    async fn test_watch_dedups_and_reconnects() {
        let connections = Arc::new(AtomicUsize::new(0));
        let url = flaky_relay(Arc::clone(&connections)).await;
        let screen = Arc::new(Screen::default());
        let viewer = Arc::new(Viewer::new(screen.clone(), None, 64));
        let cancel = CancellationToken::new();

        let task = {
            let cancel = cancel.clone();
            let url = url.clone();
            tokio::spawn(async move { watch(&url, viewer, Duration::from_millis(20), cancel).await })
        };

        for _ in 0..500 {
            if connections.load(Ordering::SeqCst) >= 2 && screen.shown.lock().len() >= 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        task.await.unwrap();

        let shown = screen.shown.lock().clone();
        // Each connection: sync (1) plus one new line; duplicates dropped
        assert_eq!(&shown[..4], &[1, 2, 1, 3]);
    }

    #[tokio::test]
    async fn test_watch_stops_when_relay_is_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        drop(listener);

        let viewer = Arc::new(Viewer::new(Arc::new(Screen::default()), None, 8));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_owned(url, viewer, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        task.await.unwrap();
    }

    async fn watch_owned(url: String, viewer: Arc<Viewer>, cancel: CancellationToken) {
        watch(&url, viewer, Duration::from_millis(10), cancel).await
    }
}
