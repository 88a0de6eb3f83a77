//! Remote provider response models

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A song as the remote provider describes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSong {
    /// Stable opaque identifier, also the base name of the stored file
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl RemoteSong {
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            artist: None,
        }
    }
}

/// One resolution of a remote playlist: the entries the provider can still
/// serve and the ones it reports as broken or removed upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default)]
    pub found: Vec<RemoteSong>,
    #[serde(default)]
    pub failed: Vec<String>,
}

impl Resolution {
    /// Ids of the entries the provider currently resolves, in playlist order
    pub fn found_ids(&self) -> impl Iterator<Item = &str> {
        self.found.iter().map(|s| s.id.as_str())
    }
}

/// Raw media bytes for one song
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub data: Bytes,
    /// File extension without the leading dot, e.g. "m4a"
    pub extension: String,
}
