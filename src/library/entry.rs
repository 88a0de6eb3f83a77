//! Per-song ledger records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which tag fields have already been written to the stored file.
///
/// Flags are monotone: once a field is marked written it stays written, so a
/// later run never re-touches a field it already stamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStatus {
    #[serde(default)]
    pub title: bool,
    #[serde(default)]
    pub artist: bool,
    #[serde(default)]
    pub artwork: bool,
}

impl TagStatus {
    /// All three gated fields have been written
    pub fn is_complete(&self) -> bool {
        self.title && self.artist && self.artwork
    }

    /// Union with another status; the result is a superset of both
    pub fn merge(&mut self, other: TagStatus) {
        self.title |= other.title;
        self.artist |= other.artist;
        self.artwork |= other.artwork;
    }

    /// True when `self` contains every flag set in `other`
    pub fn is_superset_of(&self, other: &TagStatus) -> bool {
        (self.title || !other.title)
            && (self.artist || !other.artist)
            && (self.artwork || !other.artwork)
    }
}

/// Ledger record for one known song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongEntry {
    /// Desired title tag, set from remote metadata or external tools
    pub title: Option<String>,
    /// Desired artist tag
    pub artist: Option<String>,
    /// Path to a cover image file to embed
    pub artwork: Option<PathBuf>,
    /// Completed tag writes
    #[serde(default)]
    pub status: TagStatus,
    /// Hex SHA-256 of the stored bytes, recorded at fetch time
    pub sha256: Option<String>,
    /// When this song was first added to the ledger
    pub added_at: DateTime<Utc>,
}

impl SongEntry {
    /// Create an untouched entry
    pub fn new() -> Self {
        Self {
            title: None,
            artist: None,
            artwork: None,
            status: TagStatus::default(),
            sha256: None,
            added_at: Utc::now(),
        }
    }

    pub fn with_meta(title: Option<String>, artist: Option<String>) -> Self {
        Self {
            title,
            artist,
            ..Self::new()
        }
    }
}

impl Default for SongEntry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_starts_empty() {
        let entry = SongEntry::new();
        assert!(!entry.status.title);
        assert!(!entry.status.artist);
        assert!(!entry.status.artwork);
        assert!(!entry.status.is_complete());
    }

    #[test]
    fn test_merge_is_monotone() {
        let mut status = TagStatus {
            title: true,
            ..TagStatus::default()
        };
        let before = status;

        status.merge(TagStatus {
            artist: true,
            ..TagStatus::default()
        });

        assert!(status.is_superset_of(&before));
        assert!(status.title && status.artist && !status.artwork);

        // Merging an empty status changes nothing
        status.merge(TagStatus::default());
        assert!(status.title && status.artist && !status.artwork);
    }

    #[test]
    fn test_is_complete_requires_all_flags() {
        let mut status = TagStatus {
            title: true,
            artist: true,
            artwork: false,
        };
        assert!(!status.is_complete());
        status.artwork = true;
        assert!(status.is_complete());
    }
}
