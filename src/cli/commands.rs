//! CLI command handlers

use anyhow::Result;
use clap_complete::generate;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use super::AuthManager;
use crate::config::Config;
use crate::library::{SongDb, ledger};
use crate::remote::RemoteClient;
use crate::sync::{Classification, Command, Engine, Outcome, PlaylistVerb};

/// Handle the `auth` command
pub async fn auth(url: Option<String>, token: Option<String>, force: bool) -> Result<()> {
    println!("{}", "Configuring provider credentials...".cyan());

    let creds = AuthManager::authenticate(url, token, force).await?;

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!("  Provider: {}", creds.url);
    println!();
    println!("Credentials stored securely in system keyring.");

    // Scaffold a config file on first use so there is something to edit
    let config = Config::load()?;
    if config.playlists.is_empty() {
        config.save()?;
        println!("Add playlists to the tunevault config file to start syncing.");
    }

    Ok(())
}

/// Build an engine from stored credentials and the config file
async fn build_engine(parallel: Option<usize>) -> Result<Engine> {
    let creds = AuthManager::load().map_err(|_| {
        anyhow::anyhow!("No credentials found. Run 'tunevault auth' first to configure.")
    })?;

    let mut config = Config::load()?;
    if let Some(parallel) = parallel {
        config.jobs = parallel;
    }
    if config.playlists.is_empty() {
        anyhow::bail!("No playlists configured. Add playlists to the tunevault config file.");
    }

    let db = SongDb::load(&ledger::ledger_path(&config.store_root))?;
    let client = Arc::new(RemoteClient::new(&creds.url, &creds.token)?);

    let engine = Engine::new(config, db, client.clone(), client).await?;
    Ok(engine)
}

fn print_counts(counts: &Classification) {
    println!("  {} {}", "Total:               ".cyan(), counts.total);
    println!("  {} {}", "Present:             ".green(), counts.present);
    println!("  {} {}", "Missing:             ".yellow(), counts.missing);
    println!("  {} {}", "Lost - Recoverable:  ".red(), counts.lost_recoverable);
    println!(
        "  {} {}",
        "Lost - Unrecoverable:".magenta(),
        counts.lost_unrecoverable
    );
}

/// Handle the `status` command
pub async fn status(playlist: Option<String>) -> Result<()> {
    let mut engine = build_engine(None).await?;

    let names = match playlist {
        Some(name) => vec![name],
        None => engine.playlist_names(),
    };

    for name in names {
        let counts = engine.classify(&name).await?;
        println!("{}", name.bold());
        print_counts(&counts);
        println!();
    }

    Ok(())
}

/// Handle the `update` command
pub async fn update() -> Result<()> {
    let mut engine = build_engine(None).await?;

    println!("{}", "Updating song database...".cyan());
    match engine.dispatch(Command::UpdateDatabase).await? {
        Outcome::DatabaseUpdated { added } => {
            println!("{} {} new song(s) recorded.", "Done:".green().bold(), added);
        }
        _ => unreachable!("UpdateDatabase yields DatabaseUpdated"),
    }

    Ok(())
}

/// Handle the `download` command
pub async fn download(playlist: String, parallel: Option<usize>) -> Result<()> {
    let mut engine = build_engine(parallel).await?;

    let slots = match engine
        .dispatch(Command::PlaylistAction {
            name: playlist.clone(),
            verb: PlaylistVerb::Download,
        })
        .await?
    {
        Outcome::DownloadStarted { queued, slots, .. } => {
            println!(
                "Fetching {} missing song(s) for {} with {} worker(s)...",
                queued,
                playlist.cyan(),
                slots
            );
            slots
        }
        Outcome::NothingToFetch { .. } => {
            println!("{}", "Nothing to fetch - playlist is fully present.".green());
            return Ok(());
        }
        _ => unreachable!("Download yields DownloadStarted or NothingToFetch"),
    };

    let multi = MultiProgress::new();
    let bars: Vec<ProgressBar> = (0..slots)
        .map(|slot| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{prefix:>6} [{bar:30.magenta/blue}] {pos:>3}%")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            bar.set_prefix(format!("DL-{}", slot));
            bar
        })
        .collect();

    let mut cancelled = false;
    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if let Outcome::Progress(progress) =
                    engine.dispatch(Command::ShowDownloadProgress).await?
                {
                    if let Some((_, snapshot)) = progress.iter().find(|(n, _)| *n == playlist) {
                        for (bar, pct) in bars.iter().zip(&snapshot.slots) {
                            bar.set_position(*pct as u64);
                        }
                    }
                }

                let finished = match engine.poll_downloads().await {
                    Ok(finished) => finished,
                    Err(e) => {
                        for bar in &bars {
                            bar.finish_and_clear();
                        }
                        return Err(e.into());
                    }
                };

                if let Some((name, counts)) = finished.into_iter().find(|(n, _)| *n == playlist) {
                    for bar in &bars {
                        bar.finish_and_clear();
                    }
                    if cancelled {
                        println!("{}", "Download cancelled.".yellow().bold());
                    } else {
                        println!("{}", "Download complete!".green().bold());
                    }
                    println!("{}", name.bold());
                    print_counts(&counts);
                    break;
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancelled => {
                cancelled = true;
                if let Outcome::Cancelled { drained } =
                    engine.dispatch(Command::CancelRequested).await?
                {
                    println!(
                        "{} ({} queued item(s) dropped, waiting for in-flight fetches)",
                        "Cancelling...".yellow(),
                        drained
                    );
                }
            }
        }
    }

    Ok(())
}

/// Handle the `link` command
pub async fn link(playlist: String) -> Result<()> {
    let mut engine = build_engine(None).await?;

    println!("Linking {} into its playlist directory...", playlist.cyan());
    match engine
        .dispatch(Command::PlaylistAction {
            name: playlist,
            verb: PlaylistVerb::Link,
        })
        .await?
    {
        Outcome::Linked { name, report } => {
            println!("{}", "Link pass complete!".green().bold());
            println!("  Playlist: {}", name);
            println!("  New links: {}", report.linked);
            println!("  Relinked:  {}", report.relinked);
            println!("  Kept:      {}", report.kept);
        }
        _ => unreachable!("Link yields Linked"),
    }

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as clap::CommandFactory>::command();
    generate(shell, &mut cmd, "tunevault", &mut io::stdout());
}
