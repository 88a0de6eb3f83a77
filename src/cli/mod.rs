//! CLI module for tunevault

use clap::{Parser, Subcommand};

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

#[derive(Parser, Debug)]
#[command(name = "tunevault", about = "Keep a local music library in sync with remote playlists")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure remote provider credentials
    Auth {
        /// Provider base URL
        #[arg(long, env = "TUNEVAULT_URL")]
        url: Option<String>,

        /// API token
        #[arg(short, long, env = "TUNEVAULT_TOKEN")]
        token: Option<String>,

        /// Force re-authentication (ignore stored credentials)
        #[arg(long)]
        force: bool,
    },

    /// Show classification counts for configured playlists
    Status {
        /// Playlist name (shows all if omitted)
        playlist: Option<String>,
    },

    /// Add unseen remote songs to the ledger
    Update,

    /// Fetch a playlist's missing songs into the content store
    Download {
        /// Playlist name from the config
        #[arg(value_name = "PLAYLIST")]
        playlist: String,

        /// Number of parallel fetch workers
        #[arg(short, long)]
        parallel: Option<usize>,
    },

    /// Hard-link a playlist's stored songs into its directory
    Link {
        /// Playlist name from the config
        #[arg(value_name = "PLAYLIST")]
        playlist: String,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
