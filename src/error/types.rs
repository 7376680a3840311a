//! Error taxonomy
//!
//! Every failure below the refresh coordinator is a typed value. The
//! coordinator is the only place that decides whether an error is retried,
//! notified, or merely surfaced, so the variants are split by the decision
//! they drive rather than by the library that produced them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credentials are loaded at all
    #[error("Not authenticated: {reason}")]
    Authentication {
        /// Why the credential set is not usable
        reason: String,
    },

    /// Upstream answered 401/403; recoverable through one refresh
    #[error("Session expired during {operation} (HTTP {status})")]
    SessionExpired {
        /// HTTP status that signalled the expiry
        status: u16,
        /// Upstream operation that was being performed
        operation: String,
    },

    /// Transport failure, timeout, or any non-2xx other than 401/403
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
        /// HTTP status when the server answered at all
        status: Option<u16>,
    },

    /// Credential store I/O or decryption failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No credential source could produce a usable set
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// Configuration errors
    #[error("Configuration error in {field}: {message}")]
    Configuration {
        /// The configuration field that has an error
        field: String,
        /// Error message describing the issue
        message: String,
    },

    /// Upstream answered 2xx with a payload we could not understand
    #[error("Unexpected payload from {operation}: {message}")]
    Parse {
        /// Upstream operation whose payload failed to parse
        operation: String,
        /// Parser message
        message: String,
    },

    /// A refresh-and-retry sequence failed; the user has to log in again
    #[error("{message}")]
    ReauthRequired {
        /// User-facing summary
        message: String,
        /// The failure that ended the sequence
        #[source]
        cause: Box<Error>,
    },

    /// Another poll cycle currently holds the coordinator
    #[error("A poll cycle is already in progress")]
    CycleInProgress,

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal issue
        message: String,
    },
}

/// Credential store failures
///
/// All of these are recoverable: callers treat them as "no stored
/// credentials available" and move on to another source.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The blob or key file does not exist
    #[error("Credential store file not found: {}", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Authentication tag mismatch: wrong key or tampered ciphertext
    #[error("Failed to decrypt stored credentials")]
    DecryptFailed,

    /// Blob is truncated, has an unknown version, or holds bad plaintext
    #[error("Stored credentials are corrupt: {reason}")]
    Corrupt {
        /// What was wrong with the data
        reason: String,
    },

    /// Underlying filesystem error while reading or writing
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Credential acquisition failures
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Every configured source was tried and none yielded a usable set
    #[error("All credential sources exhausted: {}", failures.join("; "))]
    AllSourcesExhausted {
        /// One `source: reason` entry per source that was tried
        failures: Vec<String>,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an authentication error
    pub fn not_authenticated<S: Into<String>>(reason: S) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Create a session expired error
    pub fn session_expired<S: Into<String>>(status: u16, operation: S) -> Self {
        Self::SessionExpired {
            status,
            operation: operation.into(),
        }
    }

    /// Create a network error without an HTTP status
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            status: None,
        }
    }

    /// Create a network error for an unexpected HTTP status
    pub fn network_status<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Network {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(field: S, message: S) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a payload parse error
    pub fn parse(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Wrap the error that ended a refresh sequence
    pub fn reauth_required(cause: Error) -> Self {
        Self::ReauthRequired {
            message: "Session expired, please re-authenticate via the companion service"
                .to_string(),
            cause: Box::new(cause),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for the one signal that triggers a credential refresh
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired { .. })
    }

    /// True when a refresh could plausibly fix this error
    ///
    /// Missing credentials count: they are re-acquired the same way an
    /// expired session is.
    pub fn needs_refresh(&self) -> bool {
        matches!(
            self,
            Error::SessionExpired { .. } | Error::Authentication { .. }
        )
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::Authentication { .. } => "authentication",
            Error::SessionExpired { .. } => "session_expired",
            Error::Network { .. } => "network",
            Error::Storage(..) => "storage",
            Error::Acquisition(..) => "acquisition",
            Error::Configuration { .. } => "configuration",
            Error::Parse { .. } => "parse",
            Error::ReauthRequired { .. } => "reauth_required",
            Error::CycleInProgress => "cycle_in_progress",
            Error::Json(..) => "json",
            Error::Toml(..) => "toml",
            Error::Url(..) => "url",
            Error::Io(..) => "io",
            Error::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("field", "test config error");
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(
            err.to_string(),
            "Configuration error in field: test config error"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_session_expired_is_the_only_refresh_signal_from_upstream() {
        assert!(Error::session_expired(401, "get-household").is_session_expired());
        assert!(!Error::network_status(500, "boom").is_session_expired());
        assert!(!Error::parse("get-devices", "missing field").is_session_expired());
    }

    #[test]
    fn test_needs_refresh() {
        assert!(Error::not_authenticated("empty").needs_refresh());
        assert!(Error::session_expired(403, "get-devices").needs_refresh());
        assert!(!Error::network("timed out").needs_refresh());
        assert!(!Error::from(StorageError::DecryptFailed).needs_refresh());
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: Error = StorageError::Corrupt {
            reason: "unknown version 7".to_string(),
        }
        .into();
        assert_eq!(err.category(), "storage");
        assert!(err.to_string().contains("unknown version 7"));
    }

    #[test]
    fn test_exhaustion_lists_every_source() {
        let err: Error = AcquisitionError::AllSourcesExhausted {
            failures: vec![
                "companion(http://localhost:8100): timed out".to_string(),
                "store: file not found".to_string(),
            ],
        }
        .into();
        let text = err.to_string();
        assert!(text.contains("timed out"));
        assert!(text.contains("store: file not found"));
    }

    #[test]
    fn test_reauth_required_keeps_cause() {
        use std::error::Error as _;

        let err = Error::reauth_required(Error::session_expired(401, "get-household"));
        assert_eq!(err.category(), "reauth_required");
        let source = err.source().unwrap();
        assert!(source.to_string().contains("HTTP 401"));
    }
}
