//! Relay server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use lain_broadcast::{BroadcastState, Scheduler, SessionRegistry};
use lain_core::LainConfig;
use lain_redis::{BroadcastArchive, ChatStore, MemoryStore, RedisStore};
use lain_services::{CannedInferenceClient, HttpInferenceClient, InferenceClient};
use lain_web::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Generate lines from a canned table instead of the inference service
    #[arg(long)]
    pub offline: bool,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (with --log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, mut config: LainConfig) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let inference: Arc<dyn InferenceClient> = if args.offline {
        Arc::new(CannedInferenceClient::new())
    } else {
        Arc::new(HttpInferenceClient::new(
            &config.inference.url,
            config.inference.timeout(),
        ))
    };

    let (chat, archive) = open_stores(&config).await;

    let state = Arc::new(BroadcastState::seeded_from_clock(
        config.broadcast.history_capacity,
    ));
    let registry = Arc::new(SessionRegistry::new(state));
    let scheduler = Arc::new(
        Scheduler::new(
            Arc::clone(&registry),
            Arc::clone(&inference),
            &config.broadcast,
            config.inference.timeout(),
        )
        .with_archive(archive),
    );

    let host = config.server.host.clone();
    let port = config.server.port;

    println!();
    println!("  {} {}", "Lain.TV".magenta().bold(), "Broadcast Relay".bold());
    println!();
    println!("  {}  ws://{}:{}/ws", "WebSocket".green(), host, port);
    println!("  {}     http://{}:{}/status", "Status".green(), host, port);
    if args.offline {
        println!("  {}  canned lines", "Inference".green());
    } else {
        println!("  {}  {}", "Inference".green(), config.inference.url);
    }
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        shutdown.cancel();
    });

    let scheduler_task = scheduler.spawn(cancel.clone());

    let app_state = AppState::new(registry, inference, chat, config.broadcast.session_buffer);
    let served = lain_web::run_server(app_state, &host, port, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }

    served
}

/// Redis when configured and reachable, otherwise in-process buffers.
async fn open_stores(config: &LainConfig) -> (Arc<dyn ChatStore>, Arc<dyn BroadcastArchive>) {
    if let Some(url) = &config.redis_url {
        match lain_redis::init_pool(url).await {
            Ok(pool) => {
                info!("Persisting chat and broadcasts to Redis");
                let store = Arc::new(RedisStore::new(pool));
                let chat: Arc<dyn ChatStore> = store.clone();
                let archive: Arc<dyn BroadcastArchive> = store;
                return (chat, archive);
            }
            Err(e) => warn!(error = %e, "Redis unavailable, keeping chat and broadcasts in memory"),
        }
    }
    let store = Arc::new(MemoryStore::default());
    let chat: Arc<dyn ChatStore> = store.clone();
    let archive: Arc<dyn BroadcastArchive> = store;
    (chat, archive)
}
