//! At-rest credential storage
//!
//! AES-256-GCM sealed cookie payloads with atomic, owner-only writes.

pub mod blob;
pub mod credential_store;

pub use credential_store::CredentialStore;
