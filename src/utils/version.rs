//! Build version and the identity sent to local collaborators

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}

/// `User-Agent` for requests to the companion and Home Assistant
///
/// Upstream dashboard calls use the configured browser agent instead.
pub fn service_user_agent() -> String {
    format!("pdsync/{}", VERSION)
}
