//! HTTP client for the remote playlist provider

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::SyncError;

use super::models::{FetchedMedia, Resolution};
use super::{MediaFetcher, PlaylistProvider, ProgressFn};

/// Extension used when the provider does not declare a media type
const DEFAULT_EXTENSION: &str = "m4a";

/// Bearer-token HTTP client for the playlist metadata and media endpoints
#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    token: String,
    http_client: Client,
}

impl RemoteClient {
    /// Create a new provider client
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).with_context(|| format!("Invalid provider URL: {}", base_url))?;

        let http_client = Client::builder()
            .user_agent("tunevault/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            token: token.to_string(),
            http_client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    /// Test connection and credentials against the provider
    pub async fn ping(&self) -> Result<()> {
        let url = self.endpoint("ping");
        debug!("Pinging provider: {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to connect to provider")?;

        if !response.status().is_success() {
            anyhow::bail!("Provider rejected credentials (status {})", response.status());
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl PlaylistProvider for RemoteClient {
    async fn resolve(&self, source_id: &str) -> Result<Resolution, SyncError> {
        let url = self.endpoint(&format!("playlists/{}", urlencoding::encode(source_id)));
        debug!("Resolving playlist {}: {}", source_id, url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::Provider(format!(
                "playlist {} resolution failed with status {}",
                source_id,
                response.status()
            )));
        }

        let resolution: Resolution = response.json().await?;

        debug!(
            "Resolved playlist {}: {} found, {} failed",
            source_id,
            resolution.found.len(),
            resolution.failed.len()
        );
        Ok(resolution)
    }
}

#[async_trait::async_trait]
impl MediaFetcher for RemoteClient {
    async fn fetch(&self, id: &str, progress: ProgressFn<'_>) -> Result<FetchedMedia, SyncError> {
        let url = self.endpoint(&format!("media/{}", urlencoding::encode(id)));
        debug!("Downloading song {}: {}", id, url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SyncError::FetchFailed {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SyncError::FetchFailed {
                id: id.to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        let extension = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(extension_for)
            .unwrap_or(DEFAULT_EXTENSION)
            .to_string();

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut data: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SyncError::FetchFailed {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
            data.extend_from_slice(&chunk);

            if let Some(total) = total.filter(|t| *t > 0) {
                let pct = (data.len() as u64 * 100 / total).min(100) as u8;
                progress(pct);
            }
        }

        progress(100);

        Ok(FetchedMedia {
            data: Bytes::from(data),
            extension,
        })
    }
}

/// Map a Content-Type header to a file extension
fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    match essence {
        "audio/mp4" | "audio/x-m4a" | "video/mp4" => "m4a",
        "audio/mpeg" => "mp3",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/ogg" => "ogg",
        _ => DEFAULT_EXTENSION,
    }
}
