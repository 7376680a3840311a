//! Configuration management
//!
//! This module handles loading and managing configuration settings
//! for the poll loop, the credential sources and the local server.

pub mod loader;
pub mod settings;

pub use loader::{CliOverrides, ConfigLoader};
pub use settings::Settings;

/// Serializes tests that read or write process environment variables
#[cfg(test)]
pub(crate) static ENV_TEST_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
