/*
[INPUT]:  Error sources (HTTP, API, serialization, wallet, storage)
[OUTPUT]: Structured error types with a coarse taxonomy and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the Clairvoyance client
#[derive(Error, Debug)]
pub enum ClairvoyanceError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response; `message` is the server's detail
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Bearer token was rejected or is missing
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// No connected wallet, or the wallet cannot sign messages
    #[error("{0}")]
    WalletUnavailable(String),

    /// Wallet provider is not part of the catalog
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Wallet provider is known but not installed locally
    #[error("Please install {name} wallet")]
    WalletNotInstalled { name: String },

    /// The human declined a connection or signature prompt
    #[error("{0}")]
    UserRejected(String),

    /// The wallet failed while signing
    #[error("{0}")]
    Signing(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Session store could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    WalletUnavailable,
    UserRejected,
    NetworkFailure,
    InvalidSession,
    Internal,
}

impl ClairvoyanceError {
    /// Map the error onto the session error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClairvoyanceError::WalletUnavailable(_)
            | ClairvoyanceError::WalletNotFound(_)
            | ClairvoyanceError::WalletNotInstalled { .. }
            | ClairvoyanceError::Signing(_) => ErrorKind::WalletUnavailable,
            ClairvoyanceError::UserRejected(_) => ErrorKind::UserRejected,
            ClairvoyanceError::Http(_)
            | ClairvoyanceError::Api { .. }
            | ClairvoyanceError::Serialization(_)
            | ClairvoyanceError::InvalidResponse(_) => ErrorKind::NetworkFailure,
            ClairvoyanceError::InvalidSession(_) => ErrorKind::InvalidSession,
            ClairvoyanceError::UrlParse(_)
            | ClairvoyanceError::Storage(_)
            | ClairvoyanceError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Check if the error means the bearer token is no longer accepted
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ClairvoyanceError::InvalidSession(_))
    }

    /// Check if retrying the same operation can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClairvoyanceError::Api { status, .. } => *status == 429 || *status >= 500,
            ClairvoyanceError::Http(_) | ClairvoyanceError::UserRejected(_) => true,
            _ => false,
        }
    }

    /// Create an error from a non-2xx status code and the server's message.
    ///
    /// 401 and 403 become [`ClairvoyanceError::InvalidSession`].
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClairvoyanceError::InvalidSession(message)
            }
            _ => ClairvoyanceError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Result type alias for Clairvoyance operations
pub type Result<T> = std::result::Result<T, ClairvoyanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(
            ClairvoyanceError::UserRejected("User rejected the request.".into()).kind(),
            ErrorKind::UserRejected
        );
        assert_eq!(
            ClairvoyanceError::WalletNotInstalled { name: "Phantom".into() }.kind(),
            ErrorKind::WalletUnavailable
        );
        assert_eq!(
            ClairvoyanceError::api_error(StatusCode::BAD_GATEWAY, "upstream").kind(),
            ErrorKind::NetworkFailure
        );
    }

    #[test]
    fn test_api_error_creation() {
        let err = ClairvoyanceError::api_error(StatusCode::BAD_REQUEST, "Invalid nonce");
        match err {
            ClairvoyanceError::Api { status, ref message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid nonce");
            }
            _ => panic!("Expected Api error variant"),
        }
        assert_eq!(err.to_string(), "Invalid nonce");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unauthorized_is_invalid_session() {
        let err = ClairvoyanceError::api_error(StatusCode::UNAUTHORIZED, "Token expired");
        assert_eq!(err.kind(), ErrorKind::InvalidSession);
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rejection_message_is_verbatim() {
        let err = ClairvoyanceError::UserRejected("User rejected the request.".into());
        assert_eq!(err.to_string(), "User rejected the request.");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(ClairvoyanceError::api_error(StatusCode::SERVICE_UNAVAILABLE, "busy").is_retryable());
        assert!(
            ClairvoyanceError::api_error(StatusCode::TOO_MANY_REQUESTS, "slow down").is_retryable()
        );
    }
}
