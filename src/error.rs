//! Error taxonomy for the sync core

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the library, pipeline, and linker layers.
///
/// Per-item fetch failures are collected during a pipeline run and only
/// re-raised after every worker has stopped; everything else propagates
/// immediately.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The persisted ledger exists but cannot be parsed. Startup must refuse
    /// to proceed rather than auto-repair over the previous good state.
    #[error("song ledger at {path:?} is corrupt")]
    CorruptLedger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The media file exists but its tag container cannot be opened or
    /// written back.
    #[error("cannot open tags in {path:?}")]
    UnreadableMedia {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    /// One song failed to download. Isolated to that item during a run.
    #[error("fetch failed for {id}: {reason}")]
    FetchFailed { id: String, reason: String },

    /// The linker found a "found" id whose store file vanished between the
    /// presence scan and the link call. Ledger/filesystem drift.
    #[error("content store file for {id} disappeared while linking")]
    InternalConsistency { id: String },

    /// A second worklist was submitted for a playlist that already has a
    /// running pipeline invocation.
    #[error("a download is already running for playlist '{name}'")]
    AlreadyRunning { name: String },

    /// A command named a playlist that is not in the configuration.
    #[error("no configured playlist named '{name}'")]
    UnknownPlaylist { name: String },

    /// Hard links require the store and the playlist directory to share a
    /// filesystem.
    #[error("store {store:?} and playlist directory {playlist:?} are on different filesystems")]
    CrossDevice { store: PathBuf, playlist: PathBuf },

    #[error("artwork processing failed: {0}")]
    Artwork(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
