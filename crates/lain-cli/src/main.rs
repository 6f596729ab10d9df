//! Lain.TV CLI
//!
//! Runs the broadcast relay, follows it from a terminal, or queries its
//! status surface.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{Cli, Commands};

const DEFAULT_LOG_FILE: &str = "lain-tv.log";

/// Used when `RUST_LOG` is unset. Dependencies only surface warnings.
const DEFAULT_LOG_FILTER: &str =
    "warn,lain_tv=info,lain_web=info,lain_broadcast=info,lain_viewer=info,lain_services=info,lain_redis=info";

/// Initialize tracing with optional file logging.
///
/// The returned guard flushes the file writer and must outlive the program.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    if let Some(path) = log_file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("log path has no file name: {}", path.display()))?;

        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

        // Log to both stdout and file when --log is used
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Serve(args) if args.log => Some(
            args.log_file
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILE.into()),
        ),
        _ => None,
    };

    let _guard = init_tracing(log_file.as_deref())?;

    cli.execute().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};

    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(event.metadata().target().to_string());
        }
    }

    #[test]
    fn test_default_filter_keeps_crate_warnings() {
        let targets = Targets::default();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
            .with(targets.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "lain_viewer::queue", "Speech synthesis failed");
            tracing::warn!(target: "lain_viewer::connection", "Relay connection failed");
            tracing::warn!(target: "lain_redis::store", "Failed to store chat message");
            tracing::info!(target: "lain_broadcast::scheduler", "Broadcast published");
            tracing::warn!(target: "hyper::proto", "dependency warning");
            tracing::info!(target: "hyper::proto", "dependency chatter");
            tracing::debug!(target: "lain_viewer::queue", "Queued line for speech");
        });

        let seen = targets.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "lain_viewer::queue",
                "lain_viewer::connection",
                "lain_redis::store",
                "lain_broadcast::scheduler",
                "hyper::proto",
            ]
        );
    }
}
