//! Control engine
//!
//! Single-threaded command dispatcher sitting between the interaction layer
//! and the sync core. The engine owns the ledger, the playlists, and at most
//! one running pipeline invocation per playlist; workers only ever see entry
//! snapshots, so nothing here needs a lock.
//!
//! The interaction layer drives it with [`Command`]s and a bounded poll tick
//! ([`Engine::poll_downloads`]); it never blocks on the pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::SyncError;
use crate::library::{self, LinkReport, MediaStore, Playlist, SongDb, SongEntry};
use crate::remote::{MediaFetcher, PlaylistProvider, Resolution};

use super::pipeline::{FetchHandle, FetchPipeline, ProgressSnapshot, WorkItem};
use super::reconcile::{self, Classification};

/// Everything the interaction layer can ask for
#[derive(Debug, Clone)]
pub enum Command {
    /// Snapshot per-slot progress of running downloads
    ShowDownloadProgress,
    /// Drain unclaimed work from every running download
    CancelRequested,
    /// Add unseen remote songs to the ledger
    UpdateDatabase,
    PlaylistAction { name: String, verb: PlaylistVerb },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistVerb {
    /// Fetch the playlist's missing songs
    Download,
    /// Materialize the playlist directory as hard links
    Link,
}

/// Reply to a dispatched command
#[derive(Debug)]
pub enum Outcome {
    Progress(Vec<(String, ProgressSnapshot)>),
    Cancelled { drained: usize },
    DatabaseUpdated { added: usize },
    DownloadStarted { name: String, queued: usize, slots: usize },
    NothingToFetch { name: String },
    Linked { name: String, report: LinkReport },
}

/// Owns all sync state and serializes every ledger access onto the caller's
/// thread
pub struct Engine {
    config: Config,
    db: SongDb,
    store: MediaStore,
    provider: Arc<dyn PlaylistProvider>,
    fetcher: Arc<dyn MediaFetcher>,
    playlists: Vec<Playlist>,
    /// One provider call per playlist per engine lifetime
    resolutions: HashMap<String, Resolution>,
    /// Running pipeline invocations, at most one per playlist
    active: HashMap<String, FetchHandle>,
}

impl Engine {
    pub async fn new(
        config: Config,
        db: SongDb,
        provider: Arc<dyn PlaylistProvider>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Result<Self, SyncError> {
        let store = MediaStore::new(config.store_root.clone());
        store.init().await?;

        let playlists = config
            .playlists
            .iter()
            .map(|p| Playlist::open(&config, p))
            .collect();

        Ok(Self {
            config,
            db,
            store,
            provider,
            fetcher,
            playlists,
            resolutions: HashMap::new(),
            active: HashMap::new(),
        })
    }

    pub fn playlist_names(&self) -> Vec<String> {
        self.playlists.iter().map(|p| p.name.clone()).collect()
    }

    /// Single dispatch switch for every interaction-layer request
    pub async fn dispatch(&mut self, command: Command) -> Result<Outcome, SyncError> {
        match command {
            Command::ShowDownloadProgress => {
                let progress = self
                    .active
                    .iter()
                    .map(|(name, handle)| (name.clone(), handle.progress()))
                    .collect();
                Ok(Outcome::Progress(progress))
            }
            Command::CancelRequested => {
                let drained: usize = self.active.values().map(FetchHandle::cancel).sum();
                info!("Cancel requested: drained {} queued items", drained);
                Ok(Outcome::Cancelled { drained })
            }
            Command::UpdateDatabase => self.update_database().await,
            Command::PlaylistAction { name, verb } => match verb {
                PlaylistVerb::Download => self.start_download(&name).await,
                PlaylistVerb::Link => self.link(&name).await,
            },
        }
    }

    /// Classify a playlist against the current store contents
    pub async fn classify(&mut self, name: &str) -> Result<Classification, SyncError> {
        let resolution = self.resolution(name).await?;
        let present = self.store.present_ids()?;
        Ok(reconcile::classify(&resolution, &present))
    }

    /// Bounded poll tick: collect every finished invocation, merge its
    /// completions into the ledger, persist, and reclassify.
    ///
    /// The first recorded fetch failure is re-raised only after the merge and
    /// save, so partial progress is never lost to a late error.
    pub async fn poll_downloads(
        &mut self,
    ) -> Result<Vec<(String, Classification)>, SyncError> {
        let names: Vec<String> = self.active.keys().cloned().collect();
        let mut finished = Vec::new();
        let mut first_error = None;

        for name in names {
            let Some(handle) = self.active.get_mut(&name) else {
                continue;
            };
            let Some(mut outcome) = handle.poll().await else {
                continue;
            };
            self.active.remove(&name);

            for (id, entry) in outcome.completed.drain(..) {
                self.db.upsert(&id, entry);
            }
            self.db.save()?;

            for (id, err) in &outcome.failed {
                error!("Fetch failed for {}: {}", id, err);
            }
            if first_error.is_none() {
                first_error = outcome.take_first_error();
            }

            let counts = self.classify(&name).await?;
            finished.push((name, counts));
        }

        if let Some((_, err)) = first_error {
            return Err(err);
        }
        Ok(finished)
    }

    async fn start_download(&mut self, name: &str) -> Result<Outcome, SyncError> {
        if self.active.contains_key(name) {
            return Err(SyncError::AlreadyRunning {
                name: name.to_string(),
            });
        }

        let resolution = self.resolution(name).await?;
        let present = self.store.present_ids()?;
        let worklist = reconcile::worklist(&resolution, &present);

        if worklist.is_empty() {
            return Ok(Outcome::NothingToFetch {
                name: name.to_string(),
            });
        }

        let items: Vec<WorkItem> = worklist
            .into_iter()
            .map(|id| {
                let entry = self.db.get(&id).cloned().unwrap_or_else(|| {
                    // First sighting: seed from remote metadata
                    resolution
                        .found
                        .iter()
                        .find(|s| s.id == id)
                        .map(|s| SongEntry::with_meta(s.title.clone(), s.artist.clone()))
                        .unwrap_or_default()
                });
                WorkItem { id, entry }
            })
            .collect();

        let queued = items.len();
        let pipeline = FetchPipeline::new(
            Arc::clone(&self.fetcher),
            self.store.clone(),
            self.config.jobs,
            &self.config.genre,
        );
        let handle = pipeline.submit(items);
        let slots = handle.slot_count();

        info!("Started download for '{}': {} items queued", name, queued);
        self.active.insert(name.to_string(), handle);

        Ok(Outcome::DownloadStarted {
            name: name.to_string(),
            queued,
            slots,
        })
    }

    async fn link(&mut self, name: &str) -> Result<Outcome, SyncError> {
        let resolution = self.resolution(name).await?;
        let found: Vec<String> = resolution.found_ids().map(String::from).collect();

        let playlist = self
            .playlists
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| SyncError::UnknownPlaylist {
                name: name.to_string(),
            })?;

        let report = library::link_playlist(
            playlist,
            &mut self.db,
            &self.store,
            &found,
            &self.config.genre,
        )?;

        Ok(Outcome::Linked {
            name: name.to_string(),
            report,
        })
    }

    async fn update_database(&mut self) -> Result<Outcome, SyncError> {
        let names: Vec<String> = self.playlists.iter().map(|p| p.name.clone()).collect();
        let mut added = 0;

        for name in names {
            let resolution = self.resolution(&name).await?;
            for song in &resolution.found {
                if !self.db.contains(&song.id) {
                    self.db
                        .upsert(&song.id, SongEntry::with_meta(song.title.clone(), song.artist.clone()));
                    added += 1;
                }
            }
        }

        self.db.save()?;
        info!("Database update: {} songs added", added);
        Ok(Outcome::DatabaseUpdated { added })
    }

    /// Resolve a playlist through the provider, once per engine lifetime
    async fn resolution(&mut self, name: &str) -> Result<Resolution, SyncError> {
        if let Some(resolution) = self.resolutions.get(name) {
            return Ok(resolution.clone());
        }

        let source_id = self
            .playlists
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.source_id.clone())
            .ok_or_else(|| SyncError::UnknownPlaylist {
                name: name.to_string(),
            })?;

        let resolution = self.provider.resolve(&source_id).await?;
        self.resolutions.insert(name.to_string(), resolution.clone());
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaylistConfig;
    use crate::library::ledger;
    use crate::remote::{FetchedMedia, ProgressFn, RemoteSong};
    use bytes::Bytes;
    use std::fs;
    use std::time::Duration;

    struct FakeProvider {
        resolution: Resolution,
    }

    #[async_trait::async_trait]
    impl PlaylistProvider for FakeProvider {
        async fn resolve(&self, _source_id: &str) -> Result<Resolution, SyncError> {
            Ok(self.resolution.clone())
        }
    }

    struct FakeFetcher;

    #[async_trait::async_trait]
    impl MediaFetcher for FakeFetcher {
        async fn fetch(
            &self,
            id: &str,
            progress: ProgressFn<'_>,
        ) -> Result<FetchedMedia, SyncError> {
            progress(99);
            Ok(FetchedMedia {
                data: Bytes::from(format!("media-{}", id)),
                extension: "m4a".to_string(),
            })
        }
    }

    fn test_config(tag: &str) -> Config {
        let dir = std::env::temp_dir().join(format!(
            "tunevault-engine-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Config {
            store_root: dir.join("store"),
            playlists_root: dir.join("playlists"),
            jobs: 2,
            playlists: vec![PlaylistConfig {
                name: "Mix".to_string(),
                source_id: "PL1".to_string(),
                location: None,
            }],
            ..Config::default()
        }
    }

    async fn engine_with(tag: &str, resolution: Resolution) -> Engine {
        let config = test_config(tag);
        let db = SongDb::load(&ledger::ledger_path(&config.store_root)).unwrap();
        Engine::new(
            config,
            db,
            Arc::new(FakeProvider { resolution }),
            Arc::new(FakeFetcher),
        )
        .await
        .unwrap()
    }

    fn resolution(found: &[&str], failed: &[&str]) -> Resolution {
        Resolution {
            found: found.iter().map(|id| RemoteSong::bare(*id)).collect(),
            failed: failed.iter().map(|id| id.to_string()).collect(),
        }
    }

    async fn poll_until_finished(engine: &mut Engine) -> Vec<(String, Classification)> {
        loop {
            let finished = engine.poll_downloads().await.unwrap();
            if !finished.is_empty() {
                return finished;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_download_merges_ledger_and_reclassifies() {
        let mut engine = engine_with("download", resolution(&["a", "b"], &["c"])).await;

        let outcome = engine
            .dispatch(Command::PlaylistAction {
                name: "Mix".to_string(),
                verb: PlaylistVerb::Download,
            })
            .await
            .unwrap();
        match outcome {
            Outcome::DownloadStarted { queued, .. } => assert_eq!(queued, 2),
            other => panic!("expected DownloadStarted, got {:?}", other),
        }

        let finished = poll_until_finished(&mut engine).await;
        assert_eq!(finished.len(), 1);
        let (name, counts) = &finished[0];
        assert_eq!(name, "Mix");
        assert_eq!(counts.present, 2);
        assert_eq!(counts.missing, 0);
        assert_eq!(counts.lost_unrecoverable, 1);

        assert!(engine.db.get("a").unwrap().sha256.is_some());
        assert!(engine.db.get("b").unwrap().sha256.is_some());
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected() {
        let mut engine = engine_with("guard", resolution(&["a"], &[])).await;

        engine
            .dispatch(Command::PlaylistAction {
                name: "Mix".to_string(),
                verb: PlaylistVerb::Download,
            })
            .await
            .unwrap();

        let second = engine
            .dispatch(Command::PlaylistAction {
                name: "Mix".to_string(),
                verb: PlaylistVerb::Download,
            })
            .await;
        assert!(matches!(second, Err(SyncError::AlreadyRunning { .. })));

        poll_until_finished(&mut engine).await;
    }

    #[tokio::test]
    async fn test_nothing_to_fetch_when_all_present() {
        let mut engine = engine_with("nothing", resolution(&["a"], &[])).await;
        fs::write(engine.store.root().join("a.m4a"), b"already here").unwrap();

        let outcome = engine
            .dispatch(Command::PlaylistAction {
                name: "Mix".to_string(),
                verb: PlaylistVerb::Download,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::NothingToFetch { .. }));
    }

    #[tokio::test]
    async fn test_update_database_adds_unseen_songs() {
        let mut engine = engine_with(
            "update",
            Resolution {
                found: vec![RemoteSong {
                    id: "a".to_string(),
                    title: Some("Song A".to_string()),
                    artist: Some("Artist A".to_string()),
                }],
                failed: vec![],
            },
        )
        .await;

        let outcome = engine.dispatch(Command::UpdateDatabase).await.unwrap();
        match outcome {
            Outcome::DatabaseUpdated { added } => assert_eq!(added, 1),
            other => panic!("expected DatabaseUpdated, got {:?}", other),
        }
        assert_eq!(engine.db.get("a").unwrap().title.as_deref(), Some("Song A"));

        // Second run sees nothing new
        let outcome = engine.dispatch(Command::UpdateDatabase).await.unwrap();
        match outcome {
            Outcome::DatabaseUpdated { added } => assert_eq!(added, 0),
            other => panic!("expected DatabaseUpdated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_playlist_is_an_error() {
        let mut engine = engine_with("unknown", resolution(&[], &[])).await;
        let result = engine
            .dispatch(Command::PlaylistAction {
                name: "Nope".to_string(),
                verb: PlaylistVerb::Link,
            })
            .await;
        assert!(matches!(result, Err(SyncError::UnknownPlaylist { .. })));
    }
}
