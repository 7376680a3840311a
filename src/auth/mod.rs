//! Credential acquisition
//!
//! Sources that can produce a cookie payload, and the provider that walks
//! them in priority order.

pub mod provider;
pub mod source;

pub use provider::{CookieProvider, CredentialProvider};
pub use source::{CompanionSource, CookieSource, StoredSource};
