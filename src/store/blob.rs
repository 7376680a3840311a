//! Encrypted blob format
//!
//! ```text
//! +---------+--------------+-------------------------+
//! | version | nonce (12 B) | ciphertext + GCM tag    |
//! +---------+--------------+-------------------------+
//! ```
//!
//! Only version 1 (AES-256-GCM) exists. Anything else is reported as
//! corrupt rather than guessed at.

use crate::error::StorageError;
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};

/// Current blob format version
pub const BLOB_VERSION: u8 = 1;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
const TAG_LEN: usize = 16;

/// Raw key length in bytes
pub const KEY_LEN: usize = 32;

/// Encrypt `plaintext` into a versioned blob with a fresh random nonce
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, StorageError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| StorageError::Corrupt {
            reason: "encryption failed".to_string(),
        })?;

    let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    blob.push(BLOB_VERSION);
    blob.extend_from_slice(nonce.as_slice());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`]
pub fn open(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Vec<u8>, StorageError> {
    let (&version, rest) = blob.split_first().ok_or_else(|| StorageError::Corrupt {
        reason: "empty blob".to_string(),
    })?;

    if version != BLOB_VERSION {
        return Err(StorageError::Corrupt {
            reason: format!("unknown blob version {}", version),
        });
    }

    if rest.len() < NONCE_LEN + TAG_LEN {
        return Err(StorageError::Corrupt {
            reason: format!("blob truncated to {} bytes", blob.len()),
        });
    }

    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| StorageError::DecryptFailed)
}

/// Generate a fresh random key
pub fn generate_key() -> [u8; KEY_LEN] {
    let generated = Aes256Gcm::generate_key(OsRng);
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&generated);
    key
}
