//! Credential sources
//!
//! A source produces a raw cookie payload. The provider decides what to do
//! with it; sources never fall back on their own.

use crate::store::CredentialStore;
use crate::types::{CookiePayload, CredentialSource};
use crate::utils::service_user_agent;
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// One place a credential payload can be fetched from
#[async_trait::async_trait]
pub trait CookieSource: Send + Sync {
    /// Label used in logs and in exhaustion reports
    fn name(&self) -> String;

    /// Upper bound on a single `fetch` call
    fn timeout(&self) -> Duration;

    /// Provenance recorded on credential sets built from this source
    fn origin(&self) -> CredentialSource;

    /// Whether a payload from this source should be written through to the store
    fn is_live(&self) -> bool {
        false
    }

    /// Fetch the current payload
    async fn fetch(&self) -> Result<CookiePayload>;
}

/// Companion service exposing the browser-authenticated session
#[derive(Debug, Clone)]
pub struct CompanionSource {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl CompanionSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(service_user_agent())
            .build()
            .map_err(|e| Error::config("companion", &format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `GET /api/health`
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Companion health probe at {} failed: {}", url, e);
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl CookieSource for CompanionSource {
    fn name(&self) -> String {
        format!("companion({})", self.base_url)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn origin(&self) -> CredentialSource {
        CredentialSource::Companion(self.base_url.clone())
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<CookiePayload> {
        let url = format!("{}/api/cookies", self.base_url);
        debug!("Requesting cookies from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::network(format!("companion request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(Error::network_status(404, "companion holds no cookies"));
            }
            other => {
                return Err(Error::network_status(
                    other.as_u16(),
                    format!("companion answered {}", other),
                ));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(format!("companion body read failed: {}", e)))?;

        CookiePayload::from_json(&body).map_err(|e| Error::parse("api/cookies", e.to_string()))
    }
}

/// Encrypted credential store used as fallback
#[derive(Debug, Clone)]
pub struct StoredSource {
    store: CredentialStore,
    timeout: Duration,
}

impl StoredSource {
    pub fn new(store: CredentialStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait::async_trait]
impl CookieSource for StoredSource {
    fn name(&self) -> String {
        "store".to_string()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn origin(&self) -> CredentialSource {
        CredentialSource::Store
    }

    async fn fetch(&self) -> Result<CookiePayload> {
        let store = self.store.clone();
        let payload = tokio::task::spawn_blocking(move || store.load_payload())
            .await
            .map_err(|e| Error::internal(format!("store read task failed: {}", e)))??;
        Ok(payload)
    }
}
