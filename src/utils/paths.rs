//! Default filesystem locations
//!
//! Follows the XDG Base Directory Specification on Linux and the platform
//! conventions elsewhere (via `dirs`).

use std::path::PathBuf;
use tracing::warn;

/// Directory name used under the platform data and config dirs
pub const APP_DIR_NAME: &str = "parent-dashboard-sync";

/// Directory holding the encrypted credential blob and its key
pub fn default_data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join(APP_DIR_NAME)
    } else if let Some(data_dir) = dirs::data_dir() {
        data_dir.join(APP_DIR_NAME)
    } else if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".local").join("share").join(APP_DIR_NAME)
    } else {
        warn!("Could not determine home directory, using current directory for credentials");
        PathBuf::from(".").join(APP_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TEST_MUTEX;

    #[test]
    fn test_default_data_dir_with_xdg() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let original = std::env::var("XDG_DATA_HOME").ok();

        unsafe {
            std::env::set_var("XDG_DATA_HOME", "/tmp/test_data");
        }

        let dir = default_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test_data").join(APP_DIR_NAME));

        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
            if let Some(value) = original {
                std::env::set_var("XDG_DATA_HOME", value);
            }
        }
    }

    #[test]
    fn test_default_data_dir_ends_with_app_name() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        assert!(default_data_dir().ends_with(APP_DIR_NAME));
    }
}
