//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lain_core::LainConfig;
use std::path::PathBuf;

pub mod serve;
pub mod status;
pub mod watch;

#[derive(Parser)]
#[command(name = "lain-tv")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./lain-tv.toml when present)
    #[arg(short, long, global = true, env = "LAIN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the broadcast relay
    Serve(serve::ServeArgs),

    /// Follow a relay from the terminal
    Watch(watch::WatchArgs),

    /// Show a relay's status
    Status(status::StatusArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = LainConfig::load(self.config.as_deref())?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Watch(args) => watch::execute(args, config).await,
            Commands::Status(args) => status::execute(args, &config).await,
        }
    }
}
