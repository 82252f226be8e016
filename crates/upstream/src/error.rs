//! Error types for upstream API communication.
//!
//! Note that an HTTP error status from the upstream is NOT an
//! [`UpstreamError`]; it is reported as an
//! [`UpstreamOutcome::Failure`](crate::UpstreamOutcome::Failure). These
//! errors cover the cases where no HTTP response was obtained at all, or
//! the response body could not be decoded.

use thiserror::Error;

/// Errors that can occur talking to the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request timed out. Distinct from other network errors so
    /// callers can report it as such.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Network-level failure (connect, TLS, etc).
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx response whose body was not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Client construction failed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type alias for upstream operations.
pub type Result<T> = std::result::Result<T, UpstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Error Display Tests ====================

    #[test]
    fn test_timeout_display() {
        let err = UpstreamError::Timeout("deadline exceeded".to_string());
        assert!(err.to_string().contains("timeout"));
        assert!(err.to_string().contains("deadline exceeded"));
    }

    #[test]
    fn test_network_display() {
        let err = UpstreamError::Network("connection refused".to_string());
        assert!(err.to_string().contains("network"));
    }

    #[test]
    fn test_decode_display() {
        let err = UpstreamError::Decode("expected value".to_string());
        assert!(err.to_string().contains("invalid response body"));
    }
}
