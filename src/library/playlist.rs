//! Playlist persisted state
//!
//! A playlist owns a link directory and an M3U file listing its current link
//! set. The M3U's modification time doubles as the linker's baseline: store
//! files newer than it get relinked.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

use crate::config::{Config, PlaylistConfig};
use crate::error::SyncError;
use crate::utils::{generate_m3u, parse_m3u};

const M3U_FILE: &str = "playlist.m3u";

/// A tracked playlist with its declared link entries
#[derive(Debug, Clone)]
pub struct Playlist {
    pub name: String,
    /// Remote playlist id resolved through the provider
    pub source_id: String,
    /// Directory holding this playlist's hard links
    pub location: PathBuf,
    /// Link filenames, in playlist order
    pub entries: Vec<String>,
}

impl Playlist {
    /// Open a playlist from its config, reading any persisted entry list
    pub fn open(config: &Config, playlist: &PlaylistConfig) -> Self {
        let location = config.playlist_location(playlist);
        let m3u_path = location.join(M3U_FILE);

        let entries = match fs::read_to_string(&m3u_path) {
            Ok(contents) => parse_m3u(&contents),
            Err(_) => Vec::new(),
        };

        debug!("Opened playlist '{}' with {} entries", playlist.name, entries.len());
        Self {
            name: playlist.name.clone(),
            source_id: playlist.source_id.clone(),
            location,
            entries,
        }
    }

    pub fn m3u_path(&self) -> PathBuf {
        self.location.join(M3U_FILE)
    }

    /// Modification time of the persisted entry list, if it exists.
    /// Used as the relink baseline.
    pub fn baseline(&self) -> Option<SystemTime> {
        fs::metadata(self.m3u_path())
            .and_then(|m| m.modified())
            .ok()
    }

    /// Persist the current entry list
    pub fn save(&self) -> Result<(), SyncError> {
        fs::create_dir_all(&self.location)?;
        fs::write(self.m3u_path(), generate_m3u(&self.entries))?;
        debug!("Saved playlist '{}' ({} entries)", self.name, self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(tag: &str) -> Config {
        let dir = std::env::temp_dir().join(format!(
            "tunevault-playlist-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Config {
            store_root: dir.join("store"),
            playlists_root: dir.join("playlists"),
            ..Config::default()
        }
    }

    fn playlist_config(name: &str) -> PlaylistConfig {
        PlaylistConfig {
            name: name.to_string(),
            source_id: "PL1".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_open_without_m3u_is_empty() {
        let config = temp_config("fresh");
        let playlist = Playlist::open(&config, &playlist_config("Mix"));
        assert!(playlist.entries.is_empty());
        assert!(playlist.baseline().is_none());
    }

    #[test]
    fn test_save_and_reopen() {
        let config = temp_config("reopen");
        let pc = playlist_config("Mix");

        let mut playlist = Playlist::open(&config, &pc);
        playlist.entries = vec!["a.m4a".to_string(), "b.m4a".to_string()];
        playlist.save().unwrap();
        assert!(playlist.baseline().is_some());

        let reopened = Playlist::open(&config, &pc);
        assert_eq!(reopened.entries, vec!["a.m4a", "b.m4a"]);
    }
}
