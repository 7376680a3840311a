//! Cookie import
//!
//! Seals a cookie export (the companion's `/api/cookies` body or a bare
//! array of cookies) into the encrypted credential store.

use crate::{
    cli::{init_logging, load_settings},
    config::{CliOverrides, settings::StoreSettings},
    store::CredentialStore,
    types::{CookiePayload, CredentialSet, CredentialSource},
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Arguments for `pdsync import`
#[derive(Debug)]
pub struct ImportArgs {
    pub file: PathBuf,
    pub config: Option<String>,
    pub verbose: bool,
}

/// What an import wrote
#[derive(Debug)]
pub struct ImportSummary {
    pub cookies: usize,
    pub usable: bool,
    pub path: PathBuf,
}

/// Run the import command
pub async fn run_import(args: ImportArgs) -> Result<()> {
    let settings = load_settings(&CliOverrides::with_config(args.config.as_deref()));
    init_logging(&settings, args.verbose);

    let store = settings.store.clone();
    let csrf_cookie_name = settings.upstream.csrf_cookie_name.clone();
    let file = args.file.clone();

    let summary =
        tokio::task::spawn_blocking(move || import_file(&file, &store, &csrf_cookie_name))
            .await
            .context("Import task failed")??;

    println!(
        "Imported {} cookies into {}",
        summary.cookies,
        summary.path.display()
    );
    if !summary.usable {
        eprintln!("Warning: the imported cookies cannot authenticate on their own");
    }
    Ok(())
}

/// Parse `file` and seal it into the store described by `settings`
pub fn import_file(
    file: &Path,
    settings: &StoreSettings,
    csrf_cookie_name: &str,
) -> Result<ImportSummary> {
    let raw = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let payload = CookiePayload::from_json(&raw)
        .with_context(|| format!("{} is not a cookie export", file.display()))?;

    if payload.cookies.is_empty() {
        anyhow::bail!("{} contains no cookies", file.display());
    }

    let set = CredentialSet::from_payload(&payload, csrf_cookie_name, CredentialSource::Manual);
    if let Some(reason) = set.unusable_reason() {
        tracing::warn!("Imported cookies are not usable yet: {}", reason);
    }

    let store = CredentialStore::from_settings(settings)
        .context("Failed to open the credential store")?;
    store
        .save_payload(&payload)
        .context("Failed to write the credential store")?;

    tracing::info!(
        "Stored {} cookies at {}",
        payload.cookies.len(),
        store.path().display()
    );

    Ok(ImportSummary {
        cookies: payload.cookies.len(),
        usable: set.is_usable(),
        path: store.path().to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn store_settings(dir: &TempDir) -> StoreSettings {
        StoreSettings {
            dir: dir.path().to_path_buf(),
            ..StoreSettings::default()
        }
    }

    fn export(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_import_usable_payload() {
        let dir = TempDir::new().unwrap();
        let settings = store_settings(&dir);
        let file = export(
            r#"{"cookies":[
                {"name":"session-id","value":"s1","domain":".amazon.com","path":"/"},
                {"name":"ft-panda-csrf-token","value":"abc","domain":".amazon.com","path":"/"}
            ],"timestamp":"2024-01-01T00:00:00","version":"1.0"}"#,
        );

        let summary = import_file(file.path(), &settings, "ft-panda-csrf-token").unwrap();
        assert_eq!(summary.cookies, 2);
        assert!(summary.usable);

        let store = CredentialStore::from_settings(&settings).unwrap();
        let payload = store.load_payload().unwrap();
        assert_eq!(payload.cookies.len(), 2);
    }

    #[test]
    fn test_import_without_token_still_stores() {
        let dir = TempDir::new().unwrap();
        let settings = store_settings(&dir);
        let file = export(r#"[{"name":"session-id","value":"s1"}]"#);

        let summary = import_file(file.path(), &settings, "ft-panda-csrf-token").unwrap();
        assert!(!summary.usable);
        assert!(settings.cookie_path().exists());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let settings = store_settings(&dir);
        let file = export("not json");

        assert!(import_file(file.path(), &settings, "ft-panda-csrf-token").is_err());
        assert!(!settings.cookie_path().exists());
    }

    #[test]
    fn test_import_rejects_empty_export() {
        let dir = TempDir::new().unwrap();
        let settings = store_settings(&dir);
        let file = export(r#"{"cookies":[]}"#);

        assert!(import_file(file.path(), &settings, "ft-panda-csrf-token").is_err());
    }
}
