//! Credential source diagnostics
//!
//! `pdsync check` reports which sources could supply cookies right now,
//! and `pdsync clear` forgets the stored ones.

use crate::{
    Settings,
    auth::CompanionSource,
    cli::{init_logging, load_settings},
    config::{CliOverrides, settings::StoreSettings},
    store::CredentialStore,
    types::{CredentialSet, CredentialSource},
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for `pdsync check` and `pdsync clear`
#[derive(Debug, Default)]
pub struct CheckArgs {
    pub config: Option<String>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanionHealth {
    pub url: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    pub path: PathBuf,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of probing every credential source
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub companions: Vec<CompanionHealth>,
    pub store: StoreHealth,
}

impl SourceReport {
    /// True when at least one source can be expected to succeed
    pub fn any_available(&self) -> bool {
        self.companions.iter().any(|c| c.available) || self.store.usable == Some(true)
    }
}

/// Print the report; exits non-zero when no source is available
pub async fn run_check(args: CheckArgs) -> Result<()> {
    let settings = load_settings(&CliOverrides::with_config(args.config.as_deref()));
    init_logging(&settings, args.verbose);

    let report = diagnose(&settings).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.any_available() {
        anyhow::bail!("No credential source is available");
    }
    Ok(())
}

/// Probe each companion's health endpoint and inspect the store
///
/// A missing store is reported without provisioning a key.
pub async fn diagnose(settings: &Settings) -> Result<SourceReport> {
    let timeout = Duration::from_secs(settings.companion.timeout_secs);
    let mut companions = Vec::new();
    for url in settings.companion_urls() {
        let source = CompanionSource::new(url.clone(), timeout)?;
        companions.push(CompanionHealth {
            available: source.is_available().await,
            url,
        });
    }

    let store_settings = settings.store.clone();
    let csrf_cookie_name = settings.upstream.csrf_cookie_name.clone();
    let store =
        tokio::task::spawn_blocking(move || inspect_store(&store_settings, &csrf_cookie_name))
            .await
            .context("Store inspection task failed")?;

    Ok(SourceReport { companions, store })
}

fn inspect_store(settings: &StoreSettings, csrf_cookie_name: &str) -> StoreHealth {
    let path = settings.cookie_path();
    let mut health = StoreHealth {
        present: path.exists(),
        path,
        cookies: None,
        usable: None,
        error: None,
    };
    if !health.present {
        return health;
    }

    let loaded = CredentialStore::from_settings(settings).and_then(|store| store.load_payload());
    match loaded {
        Ok(payload) => {
            let set =
                CredentialSet::from_payload(&payload, csrf_cookie_name, CredentialSource::Store);
            health.cookies = Some(payload.cookies.len());
            health.usable = Some(set.unusable_reason().is_none());
        }
        Err(e) => {
            health.usable = Some(false);
            health.error = Some(e.to_string());
        }
    }
    health
}

/// Delete the stored cookie blob; the key file stays
pub async fn run_clear(args: CheckArgs) -> Result<()> {
    let settings = load_settings(&CliOverrides::with_config(args.config.as_deref()));
    init_logging(&settings, args.verbose);

    let store_settings = settings.store.clone();
    let removed = tokio::task::spawn_blocking(move || clear_store(&store_settings))
        .await
        .context("Clear task failed")??;

    let path = settings.store.cookie_path();
    if removed {
        println!("Removed stored credentials at {}", path.display());
    } else {
        println!("No stored credentials at {}", path.display());
    }
    Ok(())
}

/// Returns whether a blob was there to remove
pub fn clear_store(settings: &StoreSettings) -> Result<bool> {
    if !settings.cookie_path().exists() {
        return Ok(false);
    }
    let store =
        CredentialStore::from_settings(settings).context("Failed to open the credential store")?;
    store
        .clear()
        .context("Failed to remove the stored credentials")?;
    Ok(true)
}
