//! Cookie provider
//!
//! Tries each configured source in priority order and returns the first
//! usable credential set. Sources are never combined: the anti-forgery
//! token and the session cookies only work together when they come from
//! the same browser session.

use crate::auth::source::{CompanionSource, CookieSource, StoredSource};
use crate::config::Settings;
use crate::error::AcquisitionError;
use crate::store::CredentialStore;
use crate::types::{CookiePayload, CredentialSet};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can hand the coordinator a fresh credential set
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire(&self) -> Result<CredentialSet>;
}

/// Ordered multi-source credential acquisition
pub struct CookieProvider {
    sources: Vec<Arc<dyn CookieSource>>,
    csrf_cookie_name: String,
    write_through: Option<CredentialStore>,
}

impl std::fmt::Debug for CookieProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieProvider")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("csrf_cookie_name", &self.csrf_cookie_name)
            .field("write_through", &self.write_through.is_some())
            .finish()
    }
}

impl CookieProvider {
    /// Create a provider over `sources`, consulted in the given order
    pub fn new(sources: Vec<Arc<dyn CookieSource>>, csrf_cookie_name: impl Into<String>) -> Self {
        Self {
            sources,
            csrf_cookie_name: csrf_cookie_name.into(),
            write_through: None,
        }
    }

    /// Re-save payloads obtained from live sources into `store`
    pub fn with_write_through(mut self, store: CredentialStore) -> Self {
        self.write_through = Some(store);
        self
    }

    /// Build the standard chain: custom companion, default companion, store
    ///
    /// A store that cannot be opened (unreadable key file) is left out of the
    /// chain with a warning rather than failing startup.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let companion_timeout = Duration::from_secs(settings.companion.timeout_secs);
        let mut sources: Vec<Arc<dyn CookieSource>> = Vec::new();

        for url in settings.companion_urls() {
            sources.push(Arc::new(CompanionSource::new(url, companion_timeout)?));
        }

        let store = match CredentialStore::from_settings(&settings.store) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!("Credential store unavailable, continuing without it: {}", e);
                None
            }
        };

        if let Some(store) = &store {
            sources.push(Arc::new(StoredSource::new(
                store.clone(),
                Duration::from_secs(settings.store.timeout_secs),
            )));
        }

        let provider = Self::new(sources, settings.upstream.csrf_cookie_name.clone());
        Ok(match store {
            Some(store) if settings.store.write_through => provider.with_write_through(store),
            _ => provider,
        })
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    async fn try_source(&self, source: &dyn CookieSource) -> Result<(CredentialSet, CookiePayload)> {
        let payload = tokio::time::timeout(source.timeout(), source.fetch())
            .await
            .map_err(|_| Error::network(format!("timed out after {:?}", source.timeout())))??;

        let set = CredentialSet::from_payload(&payload, &self.csrf_cookie_name, source.origin());
        match set.unusable_reason() {
            None => Ok((set, payload)),
            Some(reason) => Err(Error::not_authenticated(reason)),
        }
    }

    async fn write_through(&self, payload: CookiePayload) {
        let Some(store) = self.write_through.clone() else {
            return;
        };

        let result = tokio::task::spawn_blocking(move || store.save_payload(&payload)).await;
        match result {
            Ok(Ok(())) => debug!("Wrote companion credentials through to the store"),
            Ok(Err(e)) => warn!("Failed to write credentials to the store: {}", e),
            Err(e) => warn!("Store write task failed: {}", e),
        }
    }
}

#[async_trait::async_trait]
impl CredentialProvider for CookieProvider {
    async fn acquire(&self) -> Result<CredentialSet> {
        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let name = source.name();
            debug!("Trying credential source {}", name);

            match self.try_source(source.as_ref()).await {
                Ok((set, payload)) => {
                    info!("Acquired {} cookies from {}", set.len(), name);
                    if source.is_live() {
                        self.write_through(payload).await;
                    }
                    return Ok(set);
                }
                Err(e) => {
                    warn!("Credential source {} failed: {}", name, e);
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        Err(AcquisitionError::AllSourcesExhausted { failures }.into())
    }
}
