//! Configuration settings
//!
//! Settings are loaded from a TOML file, environment variables and
//! command-line overrides. Every field has a default, so an empty file (or
//! no file at all) yields a working configuration pointed at a local
//! companion service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// Helper functions for serde defaults
fn default_true() -> bool {
    true
}

fn default_companion_url() -> String {
    "http://localhost:8100".to_string()
}

fn default_companion_timeout() -> u64 {
    10
}

fn default_store_dir() -> PathBuf {
    crate::utils::paths::default_data_dir()
}

fn default_cookie_file() -> String {
    "cookies.enc".to_string()
}

fn default_key_file() -> String {
    ".key".to_string()
}

fn default_store_timeout() -> u64 {
    3
}

fn default_upstream_url() -> String {
    "https://www.amazon.com/parentdashboard/ajax".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_csrf_cookie_name() -> String {
    "ft-panda-csrf-token".to_string()
}

fn default_referer() -> String {
    "https://www.amazon.com/parentdashboard/".to_string()
}

fn default_origin() -> String {
    "https://www.amazon.com".to_string()
}

fn default_update_interval() -> u64 {
    60
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_notification_id() -> String {
    "amazonparent_auth_expired".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Main configuration settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Companion service (live cookie source)
    #[serde(default)]
    pub companion: CompanionSettings,
    /// Encrypted credential store (fallback cookie source)
    #[serde(default)]
    pub store: StoreSettings,
    /// Upstream dashboard API
    #[serde(default)]
    pub upstream: UpstreamSettings,
    /// Poll loop
    #[serde(default)]
    pub coordinator: CoordinatorSettings,
    /// Notification delivery
    #[serde(default)]
    pub notify: NotifySettings,
    /// Local status/control server
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Companion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionSettings {
    /// Default companion URL
    #[serde(default = "default_companion_url")]
    pub base_url: String,
    /// Custom URL, tried before `base_url` when set
    #[serde(default)]
    pub custom_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_companion_timeout")]
    pub timeout_secs: u64,
}

/// Credential store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding the blob and the key
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    /// Encrypted blob file name
    #[serde(default = "default_cookie_file")]
    pub cookie_file: String,
    /// Key file name
    #[serde(default = "default_key_file")]
    pub key_file: String,
    /// Re-save credentials obtained from the companion
    #[serde(default = "default_true")]
    pub write_through: bool,
    /// Read timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    /// Base URL of the dashboard's ajax endpoints
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Cookie carrying the anti-forgery token
    #[serde(default = "default_csrf_cookie_name")]
    pub csrf_cookie_name: String,
    /// Referer header
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Origin header for state-changing calls
    #[serde(default = "default_origin")]
    pub origin: String,
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSettings {
    /// Seconds between poll ticks
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Seconds to wait for an in-flight cycle on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    /// Notification id used for the re-authentication alert
    #[serde(default = "default_notification_id")]
    pub notification_id: String,
}

/// Notification delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifySettings {
    /// Home Assistant base URL; the log sink is used when unset
    #[serde(default)]
    pub home_assistant_url: Option<String>,
    /// Long-lived access token for Home Assistant
    #[serde(default)]
    pub token: Option<String>,
}

/// Local HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Serve the status/control API alongside the poll loop
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for CompanionSettings {
    fn default() -> Self {
        Self {
            base_url: default_companion_url(),
            custom_url: None,
            timeout_secs: default_companion_timeout(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            cookie_file: default_cookie_file(),
            key_file: default_key_file(),
            write_through: default_true(),
            timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            csrf_cookie_name: default_csrf_cookie_name(),
            referer: default_referer(),
            origin: default_origin(),
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
            notification_id: default_notification_id(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl StoreSettings {
    /// Full path of the encrypted blob
    pub fn cookie_path(&self) -> PathBuf {
        self.dir.join(&self.cookie_file)
    }

    /// Full path of the key file
    pub fn key_path(&self) -> PathBuf {
        self.dir.join(&self.key_file)
    }
}

impl CoordinatorSettings {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from environment variables on top of the defaults
    pub fn from_env() -> crate::Result<Self> {
        Self::default().apply_env()
    }

    /// Load settings from configuration file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config("file", &format!("Failed to read config file: {}", e))
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| {
            crate::Error::config("file", &format!("Failed to parse config file: {}", e))
        })?;

        Ok(settings)
    }

    /// Apply environment variable overrides
    ///
    /// Variables that are set always win over the file, unlike defaults.
    pub fn apply_env(mut self) -> crate::Result<Self> {
        if let Ok(url) = std::env::var("PDSYNC_COMPANION_URL") {
            self.companion.custom_url = Some(url);
        }

        if let Ok(dir) = std::env::var("PDSYNC_STORE_DIR") {
            self.store.dir = PathBuf::from(dir);
        }

        if let Ok(interval) = std::env::var("PDSYNC_UPDATE_INTERVAL") {
            self.coordinator.update_interval_secs = interval.parse().map_err(|e| {
                crate::Error::config(
                    "PDSYNC_UPDATE_INTERVAL",
                    &format!("Invalid interval: {}", e),
                )
            })?;
        }

        if let Ok(port) = std::env::var("PDSYNC_SERVER_PORT") {
            self.server.port = port.parse().map_err(|e| {
                crate::Error::config("PDSYNC_SERVER_PORT", &format!("Invalid port: {}", e))
            })?;
        }

        if let Ok(url) = std::env::var("PDSYNC_HA_URL") {
            self.notify.home_assistant_url = Some(url);
        }

        if let Ok(token) = std::env::var("PDSYNC_HA_TOKEN") {
            self.notify.token = Some(token);
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Companion URLs in the order they are consulted
    pub fn companion_urls(&self) -> Vec<String> {
        let mut urls = Vec::with_capacity(2);
        if let Some(custom) = &self.companion.custom_url {
            urls.push(custom.clone());
        }
        if !urls.contains(&self.companion.base_url) {
            urls.push(self.companion.base_url.clone());
        }
        urls
    }

    /// Validate configuration settings
    pub fn validate(&self) -> crate::Result<()> {
        if self.coordinator.update_interval_secs == 0 {
            return Err(crate::Error::config(
                "update_interval_secs",
                "Update interval cannot be 0",
            ));
        }

        for (name, value) in [
            ("companion.timeout_secs", self.companion.timeout_secs),
            ("store.timeout_secs", self.store.timeout_secs),
            ("upstream.request_timeout_secs", self.upstream.request_timeout_secs),
            ("upstream.connect_timeout_secs", self.upstream.connect_timeout_secs),
        ] {
            if value == 0 {
                return Err(crate::Error::config(name, "Timeout cannot be 0"));
            }
        }

        if self.server.enabled && self.server.port == 0 {
            return Err(crate::Error::config(
                "port",
                "Invalid server port: cannot be 0",
            ));
        }

        if self.upstream.csrf_cookie_name.is_empty() {
            return Err(crate::Error::config(
                "csrf_cookie_name",
                "Anti-forgery cookie name cannot be empty",
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(crate::Error::config(
                    "log_level",
                    &format!("Invalid log level: {}", self.logging.level),
                ));
            }
        }

        for (name, url) in [
            ("companion.base_url", Some(&self.companion.base_url)),
            ("companion.custom_url", self.companion.custom_url.as_ref()),
            ("upstream.base_url", Some(&self.upstream.base_url)),
            ("notify.home_assistant_url", self.notify.home_assistant_url.as_ref()),
        ] {
            if let Some(url_str) = url
                && let Err(e) = url::Url::parse(url_str)
            {
                return Err(crate::Error::config(
                    name,
                    &format!("Invalid URL '{}': {}", url_str, e),
                ));
            }
        }

        if self.notify.home_assistant_url.is_some() && self.notify.token.is_none() {
            return Err(crate::Error::config(
                "notify.token",
                "A Home Assistant URL requires an access token",
            ));
        }

        Ok(())
    }
}
