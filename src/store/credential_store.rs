//! Encrypted credential store
//!
//! Persists the last known cookie payload so the service can start (or
//! recover) without the companion. The key is provisioned once next to the
//! blob and reused for every save.

use crate::config::settings::StoreSettings;
use crate::error::StorageError;
use crate::store::blob::{self, KEY_LEN};
use crate::types::CookiePayload;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// File-backed store for the encrypted cookie blob
#[derive(Clone)]
pub struct CredentialStore {
    path: PathBuf,
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Open the store, provisioning the key file on first use
    pub fn open(path: impl Into<PathBuf>, key_path: &Path) -> Result<Self, StorageError> {
        let key = load_or_provision_key(key_path)?;
        Ok(Self {
            path: path.into(),
            key,
        })
    }

    /// Open the store described by the `[store]` settings section
    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StorageError> {
        Self::open(settings.cookie_path(), &settings.key_path())
    }

    /// Use an explicit key instead of the key file
    pub fn with_key(path: impl Into<PathBuf>, key: [u8; KEY_LEN]) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt and atomically persist `plaintext`
    pub fn save(&self, plaintext: &[u8]) -> Result<(), StorageError> {
        let sealed = blob::seal(&self.key, plaintext)?;
        write_private(&self.path, &sealed)?;
        debug!("Saved {} encrypted bytes to {:?}", sealed.len(), self.path);
        Ok(())
    }

    /// Read and decrypt the stored blob
    pub fn load(&self) -> Result<Vec<u8>, StorageError> {
        let sealed = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        blob::open(&self.key, &sealed)
    }

    /// Persist a cookie payload
    pub fn save_payload(&self, payload: &CookiePayload) -> Result<(), StorageError> {
        let plaintext = payload.to_json().map_err(|e| StorageError::Corrupt {
            reason: format!("cannot serialize payload: {}", e),
        })?;
        self.save(&plaintext)?;
        info!("Saved {} cookies to credential store", payload.cookies.len());
        Ok(())
    }

    /// Load the stored cookie payload
    pub fn load_payload(&self) -> Result<CookiePayload, StorageError> {
        let plaintext = self.load()?;
        let payload =
            CookiePayload::from_json(&plaintext).map_err(|e| StorageError::Corrupt {
                reason: format!("stored payload is not valid JSON: {}", e),
            })?;
        debug!("Loaded {} cookies from credential store", payload.cookies.len());
        Ok(payload)
    }

    /// Remove the stored blob; the key is kept
    pub fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

fn load_or_provision_key(key_path: &Path) -> Result<[u8; KEY_LEN], StorageError> {
    match fs::read_to_string(key_path) {
        Ok(encoded) => {
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| StorageError::Corrupt {
                    reason: format!("key file is not base64: {}", e),
                })?;
            <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| StorageError::Corrupt {
                reason: format!("key file holds {} bytes, expected {}", bytes.len(), KEY_LEN),
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let key = blob::generate_key();
            write_private(key_path, STANDARD.encode(key).as_bytes())?;
            info!("Provisioned new credential store key at {:?}", key_path);
            Ok(key)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to a temp file readable only by the owner, then rename
fn write_private(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawCookie;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::open(dir.path().join("cookies.enc"), &dir.path().join(".key")).unwrap()
    }

    #[test]
    fn test_load_returns_what_was_saved() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for plaintext in [&b""[..], b"x", br#"{"cookies":[{"name":"a","value":"b"}]}"#] {
            store.save(plaintext).unwrap();
            assert_eq!(store.load().unwrap(), plaintext);
        }
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn test_key_is_reused_across_opens() {
        let dir = TempDir::new().unwrap();
        store_in(&dir).save(b"persisted").unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.load().unwrap(), b"persisted");
    }

    #[test]
    fn test_wrong_key_yields_decrypt_failed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.enc");
        CredentialStore::with_key(&path, [1u8; KEY_LEN])
            .save(b"secret")
            .unwrap();

        let other = CredentialStore::with_key(&path, [2u8; KEY_LEN]);
        assert!(matches!(other.load(), Err(StorageError::DecryptFailed)));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), b"\x09not a blob at all").unwrap();
        assert!(matches!(store.load(), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_invalid_key_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join(".key");
        fs::write(&key_path, "too-short").unwrap();

        let result = CredentialStore::open(dir.path().join("cookies.enc"), &key_path);
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(b"first").unwrap();
        store.save(b"second").unwrap();

        assert!(!dir.path().join("cookies.enc.tmp").exists());
        assert_eq!(store.load().unwrap(), b"second");
    }

    #[cfg(unix)]
    #[test]
    fn test_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(b"secret").unwrap();

        let blob_mode = fs::metadata(store.path()).unwrap().permissions().mode();
        let key_mode = fs::metadata(dir.path().join(".key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(blob_mode & 0o777, 0o600);
        assert_eq!(key_mode & 0o777, 0o600);
    }

    #[test]
    fn test_payload_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let payload = CookiePayload::new(vec![
            RawCookie::new("session-id", "s1"),
            RawCookie::new("ft-panda-csrf-token", "abc"),
        ]);

        store.save_payload(&payload).unwrap();
        assert!(store.exists());
        assert_eq!(store.load_payload().unwrap(), payload);

        store.clear().unwrap();
        assert!(!store.exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_non_json_plaintext_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(b"definitely not json").unwrap();
        assert!(matches!(
            store.load_payload(),
            Err(StorageError::Corrupt { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_load_returns_any_saved_bytes(
            plaintext in prop::collection::vec(any::<u8>(), 0..4096),
        ) {
            let dir = TempDir::new().unwrap();
            let store = store_in(&dir);

            store.save(&plaintext).unwrap();
            prop_assert_eq!(store.load().unwrap(), plaintext);
        }

        #[test]
        fn prop_load_with_foreign_key_is_decrypt_failed(
            key in any::<[u8; KEY_LEN]>(),
            other in any::<[u8; KEY_LEN]>(),
            plaintext in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            prop_assume!(key != other);
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("cookies.enc");

            CredentialStore::with_key(&path, key).save(&plaintext).unwrap();
            let result = CredentialStore::with_key(&path, other).load();
            prop_assert!(matches!(result, Err(StorageError::DecryptFailed)));
        }
    }
}
