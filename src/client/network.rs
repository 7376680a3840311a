//! HTTP plumbing for the upstream client
//!
//! Builds the shared `reqwest` client and maps transport outcomes onto the
//! error taxonomy. 401 and 403 are the only statuses that mean the session
//! expired; everything else non-2xx is a network failure.

use crate::config::settings::UpstreamSettings;
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Build the HTTP client used for every upstream call
///
/// Redirects are not followed; a redirect to the sign-in page surfaces as
/// a network error instead of an HTML body that fails to parse.
pub fn build_client(settings: &UpstreamSettings) -> Result<Client> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(settings.user_agent.clone())
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .map_err(|e| {
            Error::config(
                "upstream",
                &format!("Failed to create HTTP client: {}", e),
            )
        })
}

/// Classify a response status for `operation`
pub fn classify_status(status: StatusCode, operation: &str) -> Result<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(Error::session_expired(status.as_u16(), operation))
        }
        s => Err(Error::network_status(
            s.as_u16(),
            format!("{} answered {}", operation, s),
        )),
    }
}

/// Classify a transport failure (no usable response at all)
pub fn classify_transport(error: reqwest::Error, operation: &str) -> Error {
    if error.is_timeout() {
        Error::network(format!("{} timed out", operation))
    } else if error.is_connect() {
        Error::network(format!("{} could not connect: {}", operation, error))
    } else {
        Error::network(format!("{} failed: {}", operation, error))
    }
}
