//! Relay status command.

use anyhow::{Context, Result};
use clap::Args;
use lain_core::{LainConfig, StatusReport};
use std::time::Duration;

use crate::output;

#[derive(Args)]
pub struct StatusArgs {
    /// Relay base URL
    #[arg(long)]
    pub url: Option<String>,
}

pub async fn execute(args: StatusArgs, config: &LainConfig) -> Result<()> {
    let base = args
        .url
        .unwrap_or_else(|| format!("http://{}:{}", config.server.host, config.server.port));
    let base = base.trim_end_matches('/');

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let status: StatusReport = client
        .get(format!("{}/status", base))
        .send()
        .await
        .with_context(|| format!("relay not reachable at {}", base))?
        .error_for_status()?
        .json()
        .await?;

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let inference_reachable = health["inferenceReachable"].as_bool().unwrap_or(false);

    output::print_status(base, &status, inference_reachable);
    Ok(())
}
