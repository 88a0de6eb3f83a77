//! Remote provider interfaces and HTTP client

pub mod client;
pub mod models;

use crate::error::SyncError;

pub use client::RemoteClient;
pub use models::{FetchedMedia, RemoteSong, Resolution};

/// Callback fed download progress as a 0..=100 percentage
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Resolves a remote playlist into (found, failed) entries.
///
/// Implementations own any retry policy; the core assumes a single call per
/// reconciliation pass.
#[async_trait::async_trait]
pub trait PlaylistProvider: Send + Sync {
    async fn resolve(&self, source_id: &str) -> Result<Resolution, SyncError>;
}

/// Fetches raw media bytes for one song id
#[async_trait::async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, id: &str, progress: ProgressFn<'_>) -> Result<FetchedMedia, SyncError>;
}
