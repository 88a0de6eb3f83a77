//! Content store operations
//!
//! A flat directory holding one canonical media file per song id, named
//! `<id>.<ext>`. Presence is always recomputed from the filesystem so
//! out-of-band changes are reflected immediately.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;
use tracing::debug;

use crate::error::SyncError;

/// Manages the content store directory
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if needed
    pub async fn init(&self) -> Result<(), SyncError> {
        tokio_fs::create_dir_all(&self.root).await?;
        debug!("Initialized content store at {}", self.root.display());
        Ok(())
    }

    /// Scan the store: song id (file stem) to full filename.
    ///
    /// Dot-files (the ledger lives here too) and subdirectories are ignored.
    pub fn scan(&self) -> Result<BTreeMap<String, String>, SyncError> {
        let mut files = BTreeMap::new();

        if !self.root.exists() {
            return Ok(files);
        }

        for dirent in fs::read_dir(&self.root)? {
            let dirent = dirent?;
            if !dirent.file_type()?.is_file() {
                continue;
            }
            let name = dirent.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let stem = match Path::new(&name).file_stem() {
                Some(stem) => stem.to_string_lossy().to_string(),
                None => continue,
            };
            files.insert(stem, name);
        }

        Ok(files)
    }

    /// Ids for which the store currently holds a file
    pub fn present_ids(&self) -> Result<BTreeSet<String>, SyncError> {
        Ok(self.scan()?.into_keys().collect())
    }

    /// Path of the stored file for `id`, if one exists
    pub fn path_of(&self, id: &str) -> Result<Option<PathBuf>, SyncError> {
        Ok(self.scan()?.get(id).map(|name| self.root.join(name)))
    }

    /// Persist fetched bytes under `<id>.<ext>`.
    ///
    /// Returns the written path and the hex SHA-256 of the bytes.
    pub async fn write(
        &self,
        id: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<(PathBuf, String), SyncError> {
        let extension = extension.trim_start_matches('.');
        let path = self.root.join(format!("{}.{}", id, extension));

        tokio_fs::write(&path, data).await?;

        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hex::encode(hasher.finalize());

        debug!("Stored {} ({} bytes)", path.display(), data.len());
        Ok((path, digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> MediaStore {
        let dir = std::env::temp_dir().join(format!(
            "tunevault-store-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        MediaStore::new(dir)
    }

    #[tokio::test]
    async fn test_write_then_scan() {
        let store = temp_store("scan");
        store.write("abc", "m4a", b"media").await.unwrap();

        let files = store.scan().unwrap();
        assert_eq!(files.get("abc"), Some(&"abc.m4a".to_string()));
        assert!(store.present_ids().unwrap().contains("abc"));
        assert!(store.path_of("abc").unwrap().is_some());
        assert!(store.path_of("nope").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_skips_dotfiles() {
        let store = temp_store("dotfiles");
        fs::write(store.root().join(".tunevault-ledger.json"), "{}").unwrap();
        store.write("xyz", "mp3", b"media").await.unwrap();

        let files = store.scan().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("xyz"));
    }

    #[tokio::test]
    async fn test_write_digest_is_stable() {
        let store = temp_store("digest");
        let (_, digest) = store.write("h", "m4a", b"hello").await.unwrap();
        assert_eq!(
            digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let store = MediaStore::new(PathBuf::from("/nonexistent/tunevault-test"));
        assert!(store.scan().unwrap().is_empty());
    }
}
