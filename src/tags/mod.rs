//! Idempotent tag writing
//!
//! Each stored file is stamped with descriptive tags exactly once per field:
//! the ledger's status flags record which fields are already written, so a
//! second pass over an unchanged entry is a no-op. This is what makes syncs
//! resumable after partial failures.

pub mod artwork;

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use std::fs;
use tracing::{debug, info};

use crate::error::SyncError;
use crate::library::{MediaStore, SongEntry};

/// Which gated fields a `write_tags` call will write, given the entry's
/// values, its status flags, and whether the artwork file actually exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPlan {
    pub title: bool,
    pub artist: bool,
    pub artwork: bool,
}

impl TagPlan {
    pub fn write_needed(&self) -> bool {
        self.title || self.artist || self.artwork
    }
}

/// Decide what to write: a field is written only when its value is available
/// and its status flag is not already set. Artwork additionally requires the
/// image file to exist; a missing file leaves the flag unset so the write is
/// retried on a later run.
pub fn plan(entry: &SongEntry, artwork_available: bool) -> TagPlan {
    TagPlan {
        title: entry.title.is_some() && !entry.status.title,
        artist: entry.artist.is_some() && !entry.status.artist,
        artwork: entry.artwork.is_some() && !entry.status.artwork && artwork_available,
    }
}

/// Apply pending tags to the stored file for `id` and return the entry with
/// its status flags advanced.
///
/// The media file must already exist; if it does not this is a no-op, never
/// an error (the writer does not create files). Genre and album (= id) are
/// set unconditionally whenever the container is saved; the gated fields
/// follow the plan above. The container is saved at most once per call.
pub fn write_tags(
    store: &MediaStore,
    id: &str,
    entry: &SongEntry,
    genre: &str,
) -> Result<SongEntry, SyncError> {
    let Some(path) = store.path_of(id)? else {
        debug!("No stored file for {}, skipping tag write", id);
        return Ok(entry.clone());
    };

    let artwork_file = entry
        .artwork
        .as_deref()
        .filter(|p| p.exists());
    let plan = plan(entry, artwork_file.is_some());

    if !plan.write_needed() {
        return Ok(entry.clone());
    }

    let mut tagged_file = Probe::open(&path)
        .and_then(|probe| probe.read())
        .map_err(|source| SyncError::UnreadableMedia {
            path: path.clone(),
            source,
        })?;

    let tag = match tagged_file.primary_tag_mut() {
        Some(tag) => tag,
        None => {
            if let Some(tag) = tagged_file.first_tag_mut() {
                tag
            } else {
                let tag_type = tagged_file.primary_tag_type();
                tagged_file.insert_tag(lofty::tag::Tag::new(tag_type));
                tagged_file
                    .primary_tag_mut()
                    .expect("tag was just inserted")
            }
        }
    };

    let mut updated = entry.clone();

    tag.set_genre(genre.to_string());
    tag.set_album(id.to_string());

    if plan.title
        && let Some(title) = entry.title.clone()
    {
        tag.set_title(title);
        updated.status.title = true;
    }

    if plan.artist
        && let Some(artist) = entry.artist.clone()
    {
        tag.set_artist(artist);
        updated.status.artist = true;
    }

    if plan.artwork
        && let Some(image_path) = artwork_file
    {
        let data = fs::read(image_path)?;
        let processed = artwork::process_cover(&data)?;

        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Jpeg),
            None,
            processed,
        ));
        updated.status.artwork = true;
        info!("Set cover for {}", id);
    }

    tagged_file
        .save_to_path(&path, WriteOptions::default())
        .map_err(|source| SyncError::UnreadableMedia {
            path: path.clone(),
            source,
        })?;

    debug!("Wrote tags for {} (status {:?})", id, updated.status);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::TagStatus;
    use std::path::PathBuf;

    fn entry(title: bool, artist: bool, artwork: bool) -> SongEntry {
        let mut e = SongEntry::new();
        if title {
            e.title = Some("Title".to_string());
        }
        if artist {
            e.artist = Some("Artist".to_string());
        }
        if artwork {
            e.artwork = Some(PathBuf::from("/tmp/cover.jpg"));
        }
        e
    }

    #[test]
    fn test_plan_writes_available_unset_fields() {
        let e = entry(true, true, false);
        let p = plan(&e, false);
        assert!(p.title && p.artist && !p.artwork);
        assert!(p.write_needed());
    }

    #[test]
    fn test_plan_skips_already_written_fields() {
        let mut e = entry(true, true, false);
        e.status = TagStatus {
            title: true,
            artist: false,
            artwork: false,
        };
        let p = plan(&e, false);
        assert!(!p.title);
        assert!(p.artist);
    }

    #[test]
    fn test_plan_second_pass_is_noop() {
        // Same entry, all flags advanced by the first pass
        let mut e = entry(true, true, true);
        e.status = TagStatus {
            title: true,
            artist: true,
            artwork: true,
        };
        assert!(!plan(&e, true).write_needed());
    }

    #[test]
    fn test_plan_missing_artwork_file_does_not_force_write() {
        let e = entry(false, false, true);
        let p = plan(&e, false);
        assert!(!p.artwork);
        assert!(!p.write_needed());
    }

    #[test]
    fn test_plan_absent_values_never_write() {
        let e = entry(false, false, false);
        assert!(!plan(&e, true).write_needed());
    }

    #[test]
    fn test_write_tags_missing_file_is_noop() {
        let dir = std::env::temp_dir().join(format!("tunevault-tags-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let store = MediaStore::new(dir);

        let e = entry(true, true, false);
        let result = write_tags(&store, "ghost", &e, "Nightcore").unwrap();
        assert_eq!(result, e);
    }
}
