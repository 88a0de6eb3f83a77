//! Persistent song ledger
//!
//! Single source of truth for per-song tag-write progress. All mutations are
//! in-memory until `save()` is called; callers batch mutations and persist
//! once per pass.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SyncError;

use super::entry::SongEntry;

const LEDGER_FILE: &str = ".tunevault-ledger.json";

/// Canonical ledger location inside a content store
pub fn ledger_path(store_root: &Path) -> PathBuf {
    store_root.join(LEDGER_FILE)
}

/// On-disk shape of the ledger
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    updated_at: DateTime<Utc>,
    songs: BTreeMap<String, SongEntry>,
}

/// Durable mapping from song id to its ledger entry
#[derive(Debug)]
pub struct SongDb {
    path: PathBuf,
    songs: BTreeMap<String, SongEntry>,
}

impl SongDb {
    /// Load the ledger from disk.
    ///
    /// A missing file yields an empty ledger; an unparsable file is a
    /// `CorruptLedger` error and the process must not proceed over it.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            debug!("No ledger at {}, starting empty", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                songs: BTreeMap::new(),
            });
        }

        let contents = fs::read_to_string(path)?;
        let file: LedgerFile =
            serde_json::from_str(&contents).map_err(|source| SyncError::CorruptLedger {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Loaded ledger with {} songs", file.songs.len());
        Ok(Self {
            path: path.to_path_buf(),
            songs: file.songs,
        })
    }

    /// Persist the full mapping atomically.
    ///
    /// Writes to a temp sibling and renames over the target so a crash
    /// mid-write never corrupts the previous good state.
    pub fn save(&self) -> Result<(), SyncError> {
        let file = LedgerFile {
            version: 1,
            updated_at: Utc::now(),
            songs: self.songs.clone(),
        };

        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let temp = self.path.with_extension(format!("tmp-{}", suffix));

        fs::write(&temp, contents)?;
        fs::rename(&temp, &self.path)?;

        debug!("Saved ledger ({} songs) to {}", self.songs.len(), self.path.display());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SongEntry> {
        self.songs.get(id)
    }

    /// Insert or replace an entry. In-memory only until `save()`.
    pub fn upsert(&mut self, id: &str, entry: SongEntry) {
        self.songs.insert(id.to_string(), entry);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.songs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::entry::TagStatus;

    fn temp_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tunevault-ledger-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.join(".tunevault-ledger.json")
    }

    #[test]
    fn test_load_missing_is_empty() {
        let path = temp_path("missing");
        let db = SongDb::load(&path).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = temp_path("roundtrip");
        let mut db = SongDb::load(&path).unwrap();

        let mut entry = SongEntry::with_meta(Some("Song".into()), Some("Artist".into()));
        entry.status = TagStatus {
            title: true,
            artist: false,
            artwork: false,
        };
        db.upsert("abc123", entry.clone());
        db.save().unwrap();

        let reloaded = SongDb::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("abc123"), Some(&entry));
    }

    #[test]
    fn test_corrupt_ledger_is_surfaced() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ this is not json").unwrap();

        match SongDb::load(&path) {
            Err(SyncError::CorruptLedger { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected CorruptLedger, got {:?}", other),
        }
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let path = temp_path("tmpfiles");
        let mut db = SongDb::load(&path).unwrap();
        db.upsert("x", SongEntry::new());
        db.save().unwrap();

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
