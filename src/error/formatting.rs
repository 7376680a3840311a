//! Error formatting utilities
//!
//! Renders errors for humans, for the local HTTP API and for structured logs.

use crate::Error;
use crate::error::{AcquisitionError, StorageError};
use std::error::Error as StdError;

/// Format error for display, including the chain of causes
pub fn format_error(error: &Error) -> String {
    let formatted = match error {
        Error::SessionExpired { status, operation } => {
            format!("Session expired (HTTP {}) while calling {}", status, operation)
        }

        Error::Network { message, status } => match status {
            Some(code) => format!("Network error (HTTP {}): {}", code, message),
            None => format!("Network error: {}", message),
        },

        Error::Storage(StorageError::NotFound { path }) => {
            format!("No stored credentials at {}", path.display())
        }

        Error::Acquisition(AcquisitionError::AllSourcesExhausted { failures }) => {
            if failures.is_empty() {
                "No credential sources configured".to_string()
            } else {
                format!("No credential source succeeded ({})", failures.join("; "))
            }
        }

        Error::Parse { operation, message } => {
            format!("Unexpected payload from {}: {}", operation, message)
        }

        // For everything else the Display implementation is enough
        _ => error.to_string(),
    };

    let mut result = formatted;
    let mut source = error.source();

    while let Some(cause) = source {
        if !result.contains(&cause.to_string()) {
            result = format!("{} (caused by {})", result, cause);
        }
        source = cause.source();
    }

    result
}

/// Format error for JSON API responses
pub fn format_error_for_api(error: &Error) -> serde_json::Value {
    serde_json::json!({
        "error": format_error(error),
        "category": error.category(),
        "reauth_required": matches!(error, Error::ReauthRequired { .. }),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Format error for logging with structured data
pub fn format_error_for_logging(error: &Error) -> serde_json::Value {
    let mut log_data = serde_json::json!({
        "message": format_error(error),
        "category": error.category(),
    });

    match error {
        Error::SessionExpired { status, operation } => {
            log_data["http_status"] = serde_json::Value::Number((*status).into());
            log_data["operation"] = serde_json::Value::String(operation.clone());
        }
        Error::Network {
            status: Some(code), ..
        } => {
            log_data["http_status"] = serde_json::Value::Number((*code).into());
        }
        Error::Acquisition(AcquisitionError::AllSourcesExhausted { failures }) => {
            log_data["sources_tried"] = serde_json::Value::Number(failures.len().into());
        }
        Error::ReauthRequired { cause, .. } => {
            log_data["cause_category"] = serde_json::Value::String(cause.category().into());
        }
        _ => {}
    }

    log_data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expired_formatting() {
        let error = Error::session_expired(403, "get-child-devices");
        let formatted = format_error(&error);

        assert!(formatted.contains("HTTP 403"));
        assert!(formatted.contains("get-child-devices"));
    }

    #[test]
    fn test_nested_error_formatting() {
        let error = Error::reauth_required(Error::network("connection refused"));
        let formatted = format_error(&error);

        assert!(formatted.contains("re-authenticate"));
        assert!(formatted.contains("connection refused"));
    }

    #[test]
    fn test_empty_exhaustion_formatting() {
        let error: Error = AcquisitionError::AllSourcesExhausted { failures: vec![] }.into();
        assert_eq!(format_error(&error), "No credential sources configured");
    }

    #[test]
    fn test_api_error_formatting() {
        let error = Error::reauth_required(Error::session_expired(401, "get-household"));
        let api_response = format_error_for_api(&error);

        assert_eq!(api_response["category"].as_str().unwrap(), "reauth_required");
        assert!(api_response["reauth_required"].as_bool().unwrap());
        assert!(api_response["timestamp"].is_string());
    }

    #[test]
    fn test_logging_error_formatting() {
        let error = Error::session_expired(401, "get-household");
        let log_data = format_error_for_logging(&error);

        assert_eq!(log_data["category"].as_str().unwrap(), "session_expired");
        assert_eq!(log_data["http_status"].as_u64().unwrap(), 401);
        assert_eq!(log_data["operation"].as_str().unwrap(), "get-household");
    }
}
