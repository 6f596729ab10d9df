//! Terminal viewer command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use lain_core::LainConfig;
use lain_services::HttpSpeechClient;
use lain_viewer::{AudioSink, PlaybackQueue, Viewer, Voice};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::output::TerminalCaption;

#[derive(Args)]
pub struct WatchArgs {
    /// Relay WebSocket URL
    #[arg(long)]
    pub url: Option<String>,

    /// Show lines without speaking them
    #[arg(long)]
    pub mute: bool,
}

pub async fn execute(args: WatchArgs, config: LainConfig) -> Result<()> {
    let url = args.url.unwrap_or_else(|| config.viewer.server_url.clone());

    let queue = if args.mute {
        None
    } else {
        let speech = Arc::new(HttpSpeechClient::new(&config.speech.url, config.speech.timeout()));
        Some(PlaybackQueue::new(
            speech,
            audio_sink(),
            Voice::from(&config.speech),
            config.viewer.pause(),
            config.speech.timeout(),
        ))
    };

    let viewer = Arc::new(Viewer::new(
        Arc::new(TerminalCaption),
        queue,
        config.viewer.dedup_capacity,
    ));

    println!();
    println!("  {} {}", "Lain.TV".magenta().bold(), url.dimmed());
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.cancel();
    });

    lain_viewer::watch(&url, viewer, config.viewer.reconnect_delay(), cancel).await;
    Ok(())
}

#[cfg(feature = "audio")]
fn audio_sink() -> Arc<dyn AudioSink> {
    Arc::new(lain_viewer::RodioSink)
}

#[cfg(not(feature = "audio"))]
fn audio_sink() -> Arc<dyn AudioSink> {
    Arc::new(lain_viewer::ClockSink)
}
