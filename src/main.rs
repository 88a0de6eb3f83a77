//! tunevault - Keep a local music library in sync with remote playlists

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod error;
mod library;
mod remote;
mod sync;
mod tags;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tunevault=debug,reqwest=debug"
    } else {
        "tunevault=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Auth { url, token, force } => {
            cli::commands::auth(url, token, force).await?;
        }
        Commands::Status { playlist } => {
            cli::commands::status(playlist).await?;
        }
        Commands::Update => {
            cli::commands::update().await?;
        }
        Commands::Download { playlist, parallel } => {
            cli::commands::download(playlist, parallel).await?;
        }
        Commands::Link { playlist } => {
            cli::commands::link(playlist).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
