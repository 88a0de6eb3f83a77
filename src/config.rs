//! Configuration persistence
//!
//! Stores the content store location, worker count, and the set of tracked
//! playlists in ~/.config/tunevault/config.json.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::utils::sanitize_filename;

fn default_jobs() -> usize {
    4
}

fn default_genre() -> String {
    "Nightcore".to_string()
}

/// A tracked playlist: a remote source id plus where its links live locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Display and directory key
    pub name: String,
    /// Remote playlist id resolved through the provider
    pub source_id: String,
    /// Directory for the playlist's hard links.
    /// Defaults to `<playlists_root>/<sanitized name>`.
    #[serde(default)]
    pub location: Option<PathBuf>,
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Flat directory holding one canonical file per song id
    pub store_root: PathBuf,
    /// Parent directory for playlist link directories
    pub playlists_root: PathBuf,
    /// Fetch pipeline worker count
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Genre stamped unconditionally on every tagged file
    #[serde(default = "default_genre")]
    pub genre: String,
    /// Tracked playlists
    #[serde(default)]
    pub playlists: Vec<PlaylistConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let music = dirs::audio_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            store_root: music.join("tunevault").join("store"),
            playlists_root: music.join("tunevault").join("playlists"),
            jobs: default_jobs(),
            genre: default_genre(),
            playlists: Vec::new(),
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            debug!("No config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Self =
            serde_json::from_str(&contents).context("Failed to parse config file")?;

        debug!("Loaded config with {} playlists", config.playlists.len());
        Ok(config)
    }

    /// Save the configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("tunevault").join("config.json"))
    }

    /// Resolve the link directory for a playlist
    pub fn playlist_location(&self, playlist: &PlaylistConfig) -> PathBuf {
        playlist.location.clone().unwrap_or_else(|| {
            self.playlists_root.join(sanitize_filename(&playlist.name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            "store_root": "/tmp/store",
            "playlists_root": "/tmp/playlists",
            "playlists": [{"name": "Mix", "source_id": "PL123"}]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.jobs, 4);
        assert_eq!(config.genre, "Nightcore");
        assert_eq!(config.playlists.len(), 1);
        assert!(config.playlists[0].location.is_none());
    }

    #[test]
    fn test_playlist_location_default() {
        let config: Config = serde_json::from_str(
            r#"{
                "store_root": "/tmp/store",
                "playlists_root": "/tmp/playlists",
                "playlists": [{"name": "Drive / Night", "source_id": "PL9"}]
            }"#,
        )
        .unwrap();

        let location = config.playlist_location(&config.playlists[0]);
        assert_eq!(location, PathBuf::from("/tmp/playlists/Drive ⧸ Night"));
    }

    #[test]
    fn test_playlist_location_explicit() {
        let playlist = PlaylistConfig {
            name: "Mix".to_string(),
            source_id: "PL1".to_string(),
            location: Some(PathBuf::from("/media/mix")),
        };
        let config = Config::default();
        assert_eq!(config.playlist_location(&playlist), PathBuf::from("/media/mix"));
    }
}
