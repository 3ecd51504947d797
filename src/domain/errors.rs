//! Domain error types
//!
//! This module defines the error hierarchy for Meridian. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Meridian error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum MeridianError {
    /// Missing credentials or other required settings, detected before any
    /// network call is attempted
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Practice-management API errors
    #[error("PM API error: {0}")]
    Pm(#[from] PmApiError),

    /// Local store errors
    #[error("Database error: {0}")]
    Database(String),

    /// A remote participant reference could not be mapped to a local entity
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Sync orchestration errors
    #[error("Sync error: {0}")]
    Sync(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Practice-management API errors
///
/// Errors that occur when talking to the PM system. These don't expose the
/// underlying HTTP client types, and keep token-acquisition failures distinct
/// from data-fetch failures so callers can log actionable detail.
#[derive(Debug, Error)]
pub enum PmApiError {
    /// OAuth token acquisition failed
    #[error("Token acquisition failed: {0}")]
    TokenAcquisition(String),

    /// Failed to reach the PM system
    #[error("Failed to connect to PM system: {0}")]
    ConnectionFailed(String),

    /// Non-2xx response; body is truncated for logging
    #[error("PM API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded, retry after: {0}")]
    RateLimited(String),

    /// Response body could not be parsed into the expected resource shape
    #[error("Invalid response from PM system: {0}")]
    InvalidResponse(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// Maximum number of response-body bytes carried inside [`PmApiError::Api`]
pub const API_ERROR_BODY_LIMIT: usize = 512;

impl PmApiError {
    /// Build an [`PmApiError::Api`] with the response body truncated to
    /// [`API_ERROR_BODY_LIMIT`] bytes
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > API_ERROR_BODY_LIMIT {
            let mut cut = API_ERROR_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        PmApiError::Api { status, body }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for MeridianError {
    fn from(err: std::io::Error) -> Self {
        MeridianError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MeridianError {
    fn from(err: serde_json::Error) -> Self {
        MeridianError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MeridianError {
    fn from(err: toml::de::Error) -> Self {
        MeridianError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meridian_error_display() {
        let err = MeridianError::NotConfigured("PM credentials missing".to_string());
        assert_eq!(err.to_string(), "Not configured: PM credentials missing");
    }

    #[test]
    fn test_pm_error_conversion() {
        let pm_err = PmApiError::ConnectionFailed("network unreachable".to_string());
        let err: MeridianError = pm_err.into();
        assert!(matches!(err, MeridianError::Pm(_)));
    }

    #[test]
    fn test_api_error_body_truncation() {
        let long_body = "x".repeat(2048);
        let err = PmApiError::api(500, long_body);
        if let PmApiError::Api { status, body } = err {
            assert_eq!(status, 500);
            assert_eq!(body.len(), API_ERROR_BODY_LIMIT);
        } else {
            panic!("Expected Api error");
        }
    }

    #[test]
    fn test_api_error_short_body_untouched() {
        let err = PmApiError::api(404, "not found");
        if let PmApiError::Api { body, .. } = err {
            assert_eq!(body, "not found");
        } else {
            panic!("Expected Api error");
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MeridianError = io_err.into();
        assert!(matches!(err, MeridianError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: MeridianError = json_err.into();
        assert!(matches!(err, MeridianError::Serialization(_)));
    }

    #[test]
    fn test_meridian_error_implements_std_error() {
        let err = MeridianError::Sync("test".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
