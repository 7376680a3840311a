//! Configuration loading utilities
//!
//! Layers, lowest to highest: defaults, config file, `PDSYNC_*` environment
//! variables, command line. The result is validated once, after the last
//! layer.

use crate::{Result, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--config`; beats `PDSYNC_CONFIG` and the default location
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl CliOverrides {
    /// Only `--config`, as taken by every subcommand
    pub fn with_config(config: Option<&str>) -> Self {
        Self {
            config: config.map(PathBuf::from),
            ..Self::default()
        }
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            debug!("Server host from command line: {}", host);
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            debug!("Server port from command line: {}", port);
            settings.server.port = port;
        }
    }
}

/// Builds [`Settings`] from every configuration source
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Find the config file
    ///
    /// An explicit path is returned as given, even if missing, so that
    /// loading can warn about it. Otherwise `PDSYNC_CONFIG` is used when it
    /// names an existing file, then
    /// `~/.config/parent-dashboard-sync/config.toml` (or the platform
    /// equivalent) when that exists.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Ok(config_path) = std::env::var("PDSYNC_CONFIG") {
            let path = PathBuf::from(config_path);
            if path.exists() {
                debug!("Using config file from PDSYNC_CONFIG: {:?}", path);
                return Some(path);
            }
            warn!("PDSYNC_CONFIG points to non-existent file: {:?}", path);
        }

        let default_path = dirs::config_dir()?
            .join(crate::utils::paths::APP_DIR_NAME)
            .join("config.toml");
        if default_path.exists() {
            debug!("Using default config file: {:?}", default_path);
            return Some(default_path);
        }

        debug!("No config file found");
        None
    }

    /// Defaults, then `config_file`, then the environment
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let settings = self.layered(config_file)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Every layer including the command line
    pub fn load_with(&self, overrides: &CliOverrides) -> Result<Settings> {
        let path = Self::resolve_path(overrides.config.as_deref());
        let mut settings = self.layered(path.as_deref())?;
        overrides.apply(&mut settings);
        settings.validate()?;
        info!("Configuration loaded");
        Ok(settings)
    }

    fn layered(&self, config_file: Option<&Path>) -> Result<Settings> {
        let settings = match config_file {
            Some(path) if path.exists() => {
                info!("Loading configuration from file: {:?}", path);
                Settings::from_file(path)?
            }
            Some(path) => {
                warn!("Configuration file not found: {:?}, using defaults", path);
                Settings::default()
            }
            None => Settings::default(),
        };

        settings.apply_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TEST_MUTEX;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let file = config_file(
            r#"
[server]
host = "0.0.0.0"
port = 9090

[store]
dir = "/share/amazonparent"
write_through = false
        "#,
        );

        let settings = ConfigLoader::new().load(Some(file.path())).unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.store.dir, PathBuf::from("/share/amazonparent"));
        assert!(!settings.store.write_through);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let settings = ConfigLoader::new()
            .load(Some(Path::new("/definitely/not/here/config.toml")))
            .unwrap();
        assert_eq!(settings.companion.base_url, "http://localhost:8100");
        assert_eq!(settings.coordinator.update_interval_secs, 60);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let file = config_file("[logging]\nlevel = \"loud\"");
        assert!(ConfigLoader::new().load(Some(file.path())).is_err());
    }

    #[test]
    fn test_command_line_beats_file() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let file = config_file("[server]\nhost = \"0.0.0.0\"\nport = 9090");

        let overrides = CliOverrides {
            config: Some(file.path().to_path_buf()),
            host: None,
            port: Some(7000),
        };
        let settings = ConfigLoader::new().load_with(&overrides).unwrap();

        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn test_command_line_values_are_validated() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let overrides = CliOverrides {
            config: Some(PathBuf::from("/definitely/not/here/config.toml")),
            host: None,
            port: Some(0),
        };
        assert!(ConfigLoader::new().load_with(&overrides).is_err());
    }

    #[test]
    fn test_explicit_path_is_kept_even_if_missing() {
        let path = Path::new("/definitely/not/here/config.toml");
        assert_eq!(
            ConfigLoader::resolve_path(Some(path)).as_deref(),
            Some(path)
        );
    }
}
