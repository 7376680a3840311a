//! Local API type definitions
//!
//! Request and response bodies of the status/control server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ping response for health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    /// Server uptime in seconds
    pub server_uptime: u64,

    /// Server version
    pub version: String,
}

impl PingResponse {
    /// Create a new ping response
    pub fn new(server_uptime: u64, version: impl Into<String>) -> Self {
        Self {
            server_uptime,
            version: version.into(),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Optional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Error timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Service version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            context: None,
            details: None,
            timestamp: Some(Utc::now()),
            version: Some(crate::utils::version::get_version().to_string()),
        }
    }

    /// Create error response with context
    pub fn with_context(error: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            context: Some(context.into()),
            details: None,
            timestamp: Some(Utc::now()),
            version: Some(crate::utils::version::get_version().to_string()),
        }
    }

    /// Create error response with both context and details
    pub fn with_context_and_details(
        error: impl Into<String>,
        context: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            context: Some(context.into()),
            details: Some(details),
            timestamp: Some(Utc::now()),
            version: Some(crate::utils::version::get_version().to_string()),
        }
    }

    /// Build the response body for a crate error
    ///
    /// The category goes into `context`; a failed refresh additionally
    /// carries `{"reauth_required": true}` so clients can prompt the user.
    pub fn from_error(error: &crate::Error) -> Self {
        let message = crate::error::format_error(error);
        match error {
            crate::Error::ReauthRequired { cause, .. } => Self::with_context_and_details(
                message,
                error.category(),
                serde_json::json!({
                    "reauth_required": true,
                    "cause": cause.category(),
                }),
            ),
            _ => Self::with_context(message, error.category()),
        }
    }
}

/// Body of `POST /children/{id}/pause`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseRequest {
    /// How long to suspend the limits, in minutes
    pub minutes: u32,
}

impl PauseRequest {
    /// Pause duration in seconds as the upstream expects it
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.minutes) * 60
    }
}

/// Result of a pause or resume action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Child the action applied to
    pub child_id: String,

    /// "paused" or "resumed"
    pub action: String,

    /// Pause length in seconds (0 for resume)
    pub duration_secs: u64,

    /// When the upstream accepted the change
    pub applied_at: DateTime<Utc>,
}

impl ActionResponse {
    /// Create a new action response stamped with the current time
    pub fn new(child_id: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            child_id: child_id.into(),
            action: if duration_secs == 0 { "resumed" } else { "paused" }.to_string(),
            duration_secs,
            applied_at: Utc::now(),
        }
    }
}
