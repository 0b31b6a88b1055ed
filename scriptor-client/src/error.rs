//! Error types for the Scriptor client

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Scriptor client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Error body produced by the server
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create an API error from a raw response body
    ///
    /// Uses the `error` field of a JSON body when present, otherwise the body
    /// text as-is.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());
        Self::api_error(status, message)
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if (400..500).contains(status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_body() {
        let err = ClientError::from_response_body(404, r#"{"error":"Job 42 not found"}"#);

        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "API error (status 404): Job 42 not found");
    }

    #[test]
    fn test_plain_error_body() {
        let err = ClientError::from_response_body(400, "Invalid URL: Cannot parse `x`\n");

        assert!(!err.is_not_found());
        match err {
            ClientError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid URL: Cannot parse `x`");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_classes() {
        assert!(ClientError::api_error(503, "down").is_server_error());
        assert!(!ClientError::api_error(503, "down").is_client_error());
        assert!(!ClientError::ParseError("bad".into()).is_server_error());
    }
}
