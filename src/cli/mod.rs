//! Command-line modes
//!
//! Each subcommand of `pdsync` lives in its own module. Settings loading and
//! logging setup are shared here.

pub mod actions;
pub mod check;
pub mod import;
pub mod once;
pub mod run;

use crate::{
    Settings,
    config::{CliOverrides, ConfigLoader},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Load settings for a subcommand
///
/// Runs before logging is initialized so `logging.level` can be honored.
/// A configuration that fails to load or validate is replaced by defaults.
pub fn load_settings(overrides: &CliOverrides) -> Settings {
    ConfigLoader::new().load_with(overrides).unwrap_or_else(|e| {
        // tracing is not initialized yet
        eprintln!(
            "Warning: Failed to load configuration: {}. Using defaults.",
            e
        );
        Settings::default()
    })
}

/// Pick the log filter
///
/// `--verbose` wins, then `RUST_LOG`, then `logging.level`.
pub fn log_filter(settings: &Settings, verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(&settings.logging.level)
    }
}

/// Install the global subscriber
///
/// Logs go to stderr so commands that print JSON keep stdout clean.
pub fn init_logging(settings: &Settings, verbose: bool) {
    let filter = log_filter(settings, verbose);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if settings.logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TEST_MUTEX;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_settings_from_explicit_file() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[coordinator]\nupdate_interval_secs = 120\n\n[server]\nport = 9000"
        )
        .unwrap();

        let settings = load_settings(&CliOverrides::with_config(file.path().to_str()));
        assert_eq!(settings.coordinator.update_interval_secs, 120);
        assert_eq!(settings.server.port, 9000);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[coordinator]\nupdate_interval_secs = 0").unwrap();

        let settings = load_settings(&CliOverrides::with_config(file.path().to_str()));
        assert_eq!(
            settings.coordinator.update_interval_secs,
            Settings::default().coordinator.update_interval_secs
        );
    }

    #[test]
    fn test_verbose_overrides_configured_level() {
        let mut settings = Settings::default();
        settings.logging.level = "warn".to_string();

        let filter = log_filter(&settings, true);
        assert_eq!(filter.to_string(), "debug");
    }
}
