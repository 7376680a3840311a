//! In-memory session state
//!
//! The authoritative record of which credentials the client is using. Only
//! the refresh coordinator writes to it; the API client reads it per call.

use crate::types::CredentialSet;

/// Current credentials plus a generation counter bumped on every replace
#[derive(Debug, Clone)]
pub struct SessionState {
    credentials: CredentialSet,
    generation: u64,
}

impl SessionState {
    /// Start unauthenticated at generation 0
    pub fn new() -> Self {
        Self {
            credentials: CredentialSet::empty(),
            generation: 0,
        }
    }

    /// Start from an already acquired set (generation 1)
    pub fn with_credentials(credentials: CredentialSet) -> Self {
        let mut state = Self::new();
        state.replace(credentials);
        state
    }

    pub fn current(&self) -> &CredentialSet {
        &self.credentials
    }

    /// Swap in a new credential set and return the new generation
    pub fn replace(&mut self, credentials: CredentialSet) -> u64 {
        self.credentials = credentials;
        self.generation += 1;
        self.generation
    }

    /// Drop the current credentials; the generation is kept
    pub fn clear(&mut self) {
        self.credentials = CredentialSet::empty();
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_usable()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
