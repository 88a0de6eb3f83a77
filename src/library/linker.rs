//! Playlist directory materialization
//!
//! Hard-links stored songs into playlist directories so every playlist shares
//! one canonical copy of the bytes. Links are recreated when the store file is
//! newer than the playlist's persisted baseline, which picks up re-tagged or
//! re-fetched content without duplicating storage.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::tags;

use super::ledger::SongDb;
use super::playlist::Playlist;
use super::store::MediaStore;

/// What a linking pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// New links created
    pub linked: usize,
    /// Stale links removed and recreated
    pub relinked: usize,
    /// Links left untouched
    pub kept: usize,
}

/// Materialize a playlist directory from the store.
///
/// `found` is the provider's current found set for this playlist; only ids
/// with a store file are linked, and each gets its tags completed first.
/// Rewrites the playlist's entry list and persists the ledger on success.
pub fn link_playlist(
    playlist: &mut Playlist,
    db: &mut SongDb,
    store: &MediaStore,
    found: &[String],
    genre: &str,
) -> Result<LinkReport, SyncError> {
    fs::create_dir_all(&playlist.location)?;
    ensure_same_filesystem(store.root(), &playlist.location)?;

    let present = store.scan()?;
    let baseline = playlist.baseline();
    let mut report = LinkReport::default();

    playlist.entries.clear();
    let mut seen = HashSet::new();

    for id in found {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let Some(filename) = present.get(id) else {
            debug!("Skipping {}: not in content store yet", id);
            continue;
        };

        let entry = db.get(id).cloned().unwrap_or_default();
        if !entry.status.is_complete() {
            let updated = tags::write_tags(store, id, &entry, genre)?;
            db.upsert(id, updated);
        }

        let source = store.root().join(filename);
        let target = playlist.location.join(filename);

        if !target.exists() {
            link(&source, &target, id)?;
            report.linked += 1;
        } else if is_newer_than(&source, baseline) {
            debug!("Relinking {}: store copy newer than baseline", id);
            fs::remove_file(&target)?;
            link(&source, &target, id)?;
            report.relinked += 1;
        } else {
            report.kept += 1;
        }

        playlist.entries.push(filename.clone());
    }

    playlist.save()?;
    db.save()?;

    info!(
        "Linked playlist '{}': {} new, {} relinked, {} kept",
        playlist.name, report.linked, report.relinked, report.kept
    );
    Ok(report)
}

/// Hard link, mapping a vanished source to an internal-consistency error
/// rather than a bare IO failure: the presence scan said this file existed.
fn link(source: &Path, target: &Path, id: &str) -> Result<(), SyncError> {
    fs::hard_link(source, target).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            SyncError::InternalConsistency { id: id.to_string() }
        } else {
            SyncError::Io(e)
        }
    })
}

fn is_newer_than(source: &Path, baseline: Option<std::time::SystemTime>) -> bool {
    let Some(baseline) = baseline else {
        // No persisted entry list yet: treat everything as fresh
        return true;
    };
    match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(modified) => modified > baseline,
        Err(e) => {
            warn!("Cannot stat {}: {}", source.display(), e);
            false
        }
    }
}

/// Hard links cannot cross filesystems; fail fast with a clear error instead
/// of surfacing EXDEV from the middle of a linking pass.
#[cfg(unix)]
fn ensure_same_filesystem(store_root: &Path, location: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::MetadataExt;

    let store_dev = fs::metadata(store_root)?.dev();
    let location_dev = fs::metadata(location)?.dev();

    if store_dev != location_dev {
        return Err(SyncError::CrossDevice {
            store: store_root.to_path_buf(),
            playlist: location.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_same_filesystem(_store_root: &Path, _location: &Path) -> Result<(), SyncError> {
    Ok(())
}
