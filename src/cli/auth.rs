//! Keyring-based credential storage for the remote provider

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info};

const KEYRING_SERVICE: &str = "tunevault";

/// Remote provider credentials
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub url: String,
    pub token: String,
}

/// Manages credential storage
pub struct AuthManager;

impl AuthManager {
    /// Authenticate against the remote provider.
    ///
    /// Tries to load credentials from the keyring first, or prompts for new
    /// ones. Verifies credentials work before storing.
    pub async fn authenticate(
        url: Option<String>,
        token: Option<String>,
        force: bool,
    ) -> Result<ProviderCredentials> {
        if !force {
            if let Ok(creds) = Self::load() {
                info!("Found existing credentials in keyring");
                return Ok(creds);
            }
        } else {
            debug!("Force flag set, ignoring stored credentials");
        }

        let url = url.unwrap_or_else(|| {
            Input::new()
                .with_prompt("Provider URL")
                .interact_text()
                .expect("Failed to read URL")
        });

        let token = token.unwrap_or_else(|| {
            Password::new()
                .with_prompt("API token")
                .interact()
                .expect("Failed to read token")
        });

        let creds = ProviderCredentials {
            url: url.trim_end_matches('/').to_string(),
            token,
        };

        Self::verify(&creds).await?;
        Self::store(&creds)?;
        info!("Credentials stored in keyring");

        Ok(creds)
    }

    /// Load credentials from the keyring
    pub fn load() -> Result<ProviderCredentials> {
        let url = Self::get_entry("url")?
            .get_password()
            .context("No provider URL in keyring")?;

        let token = Self::get_entry("token")?
            .get_password()
            .context("No provider token in keyring")?;

        Ok(ProviderCredentials { url, token })
    }

    /// Store credentials in the keyring
    pub fn store(creds: &ProviderCredentials) -> Result<()> {
        Self::get_entry("url")?
            .set_password(&creds.url)
            .context("Failed to store URL in keyring")?;

        Self::get_entry("token")?
            .set_password(&creds.token)
            .context("Failed to store token in keyring")?;

        debug!("Credentials stored in keyring");
        Ok(())
    }

    /// Clear stored credentials
    pub fn clear() -> Result<()> {
        let _ = Self::get_entry("url")?.delete_credential();
        let _ = Self::get_entry("token")?.delete_credential();
        info!("Credentials cleared from keyring");
        Ok(())
    }

    /// Verify credentials by pinging the provider
    async fn verify(creds: &ProviderCredentials) -> Result<()> {
        use crate::remote::RemoteClient;

        debug!("Verifying credentials against {}", creds.url);

        let client = RemoteClient::new(&creds.url, &creds.token)?;
        client.ping().await.context("Failed to verify credentials")?;

        info!("Credentials verified successfully");
        Ok(())
    }

    fn get_entry(key: &str) -> Result<Entry> {
        let entry_key = format!("provider:{}", key);
        Entry::new(KEYRING_SERVICE, &entry_key).context("Failed to access keyring")
    }
}
