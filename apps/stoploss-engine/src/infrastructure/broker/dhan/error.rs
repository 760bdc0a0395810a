//! Dhan-specific error types.

use thiserror::Error;

use crate::application::ports::{BrokerError, QuoteError};

/// Errors from the Dhan adapter.
#[derive(Debug, Error, Clone)]
pub enum DhanError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// API answered with an error or a non-success envelope status.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code or envelope status.
        code: String,
        /// Error message or remarks.
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Network error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Response body did not match the documented shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

impl From<DhanError> for BrokerError {
    fn from(err: DhanError) -> Self {
        match err {
            DhanError::Http(msg) | DhanError::Network(msg) => Self::Connection { message: msg },
            DhanError::MaxRetriesExceeded { attempts } => Self::Connection {
                message: format!("max retries exceeded after {attempts} attempts"),
            },
            DhanError::Api { code, message } => Self::RequestRejected {
                remarks: format!("{code}: {message}"),
            },
            DhanError::AuthenticationFailed => Self::AuthenticationFailed,
            DhanError::RateLimited { .. } => Self::RateLimited,
            DhanError::JsonParse(msg) | DhanError::UnexpectedResponse(msg) => {
                Self::UnexpectedResponse { message: msg }
            }
        }
    }
}

impl From<DhanError> for QuoteError {
    fn from(err: DhanError) -> Self {
        Self::Unreachable {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_rejection() {
        let err = DhanError::Api {
            code: "DH-906".to_string(),
            message: "Invalid security".to_string(),
        };
        assert!(matches!(
            BrokerError::from(err),
            BrokerError::RequestRejected { .. }
        ));
    }

    #[test]
    fn transport_errors_map_to_connection() {
        assert!(matches!(
            BrokerError::from(DhanError::Network("timeout".to_string())),
            BrokerError::Connection { .. }
        ));
        assert!(matches!(
            BrokerError::from(DhanError::MaxRetriesExceeded { attempts: 3 }),
            BrokerError::Connection { .. }
        ));
    }

    #[test]
    fn malformed_body_maps_to_unexpected_response() {
        assert!(matches!(
            BrokerError::from(DhanError::JsonParse("eof".to_string())),
            BrokerError::UnexpectedResponse { .. }
        ));
    }
}
