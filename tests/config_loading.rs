//! Configuration loading integration tests
//!
//! Tests PDSYNC_CONFIG support and the file / environment precedence.

use parent_dashboard_sync::config::ConfigLoader;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Static mutex to ensure environment variable tests don't interfere with each other
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

const TOUCHED_VARS: [&str; 4] = [
    "PDSYNC_CONFIG",
    "PDSYNC_SERVER_PORT",
    "PDSYNC_UPDATE_INTERVAL",
    "PDSYNC_COMPANION_URL",
];

/// Saves the variables a test touches and restores them on drop
struct EnvSnapshot(Vec<(&'static str, Option<String>)>);

impl EnvSnapshot {
    fn take() -> Self {
        let saved = TOUCHED_VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();
        unsafe {
            for name in TOUCHED_VARS {
                std::env::remove_var(name);
            }
        }
        Self(saved)
    }
}

impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        unsafe {
            for (name, value) in &self.0 {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }
}

fn config_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{}", content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_pdsync_config_env_var_loading() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = EnvSnapshot::take();

    let temp_file = config_file(
        r#"
[server]
host = "127.0.0.1"
port = 9999

[coordinator]
update_interval_secs = 300

[companion]
custom_url = "http://companion.lan:8100"
        "#,
    );

    unsafe {
        std::env::set_var("PDSYNC_CONFIG", temp_file.path());
    }

    let config_path = ConfigLoader::resolve_path(None);
    assert_eq!(config_path.as_deref(), Some(temp_file.path()));

    let settings = ConfigLoader::new().load(config_path.as_deref()).unwrap();
    assert_eq!(settings.server.port, 9999);
    assert_eq!(settings.coordinator.update_interval_secs, 300);
    assert_eq!(
        settings.companion_urls(),
        vec![
            "http://companion.lan:8100".to_string(),
            "http://localhost:8100".to_string()
        ]
    );
}

#[test]
fn test_env_var_overrides_config_file() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = EnvSnapshot::take();

    let temp_file = config_file(
        r#"
[server]
port = 9999

[coordinator]
update_interval_secs = 300
        "#,
    );

    unsafe {
        std::env::set_var("PDSYNC_SERVER_PORT", "8888");
        std::env::set_var("PDSYNC_COMPANION_URL", "http://10.0.0.5:8100");
    }

    let settings = ConfigLoader::new().load(Some(temp_file.path())).unwrap();

    assert_eq!(settings.server.port, 8888);
    assert_eq!(
        settings.companion.custom_url.as_deref(),
        Some("http://10.0.0.5:8100")
    );
    // Untouched by the environment
    assert_eq!(settings.coordinator.update_interval_secs, 300);
}

#[test]
fn test_invalid_env_value_is_rejected() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = EnvSnapshot::take();

    unsafe {
        std::env::set_var("PDSYNC_UPDATE_INTERVAL", "soon");
    }

    let err = ConfigLoader::new().load(None).unwrap_err();
    assert!(err.to_string().contains("PDSYNC_UPDATE_INTERVAL"));
}

#[test]
fn test_missing_file_uses_defaults() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = EnvSnapshot::take();

    let settings = ConfigLoader::new()
        .load(Some(std::path::Path::new("/nonexistent/pdsync.toml")))
        .unwrap();
    assert_eq!(settings.server.port, 8787);
    assert_eq!(settings.coordinator.notification_id, "amazonparent_auth_expired");
}

#[test]
fn test_default_config_path() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = EnvSnapshot::take();

    if let Some(path) = ConfigLoader::resolve_path(None) {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("parent-dashboard-sync"));
    }
}

#[test]
fn test_zero_interval_is_rejected() {
    let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = EnvSnapshot::take();

    let temp_file = config_file("[coordinator]\nupdate_interval_secs = 0");
    assert!(ConfigLoader::new().load(Some(temp_file.path())).is_err());
}
