//! Unified error types for the scanlink core library.
//!
//! These errors never reach a caller of [`ScanClient::scan`]: every scan
//! attempt folds its failure into a typed [`ScanOutcome`] instead. The
//! variants here exist for internal plumbing, diagnostics messages, and
//! operations (config load, base-URL updates) where a hard failure is the
//! right answer.
//!
//! [`ScanClient::scan`]: crate::client::ScanClient::scan
//! [`ScanOutcome`]: crate::types::ScanOutcome

use thiserror::Error;

/// The unified error type for all scanlink operations.
#[derive(Debug, Error)]
pub enum ScanlinkError {
    /// The underlying transport failed (DNS, connection refused, offline).
    #[error("Network unavailable: {0}")]
    Network(String),

    /// The orchestrator returned a non-2xx status.
    #[error("Orchestrator error (status {status}): {message}")]
    Server {
        /// HTTP status code returned by the orchestrator.
        status: u16,
        /// Error message, parsed from the response body when possible.
        message: String,
    },

    /// A health probe or request exceeded its client-side timeout.
    #[error("Request timed out")]
    Timeout,

    /// Reading or writing persisted state failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The configured orchestrator base address is not a valid URL.
    #[error("Invalid orchestrator URL: {0}")]
    InvalidBaseUrl(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for scanlink operations.
pub type Result<T> = std::result::Result<T, ScanlinkError>;

impl ScanlinkError {
    /// Returns `true` if this error came from the network transport or the
    /// orchestrator, as opposed to local state.
    ///
    /// Transport and server errors are treated identically by the scan flow:
    /// both degrade to "enqueue and report".
    #[inline]
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Server { .. } | Self::Timeout
        )
    }

    /// Returns `true` if this error is related to persisted state.
    ///
    /// Persistence errors are logged and swallowed; the in-memory state
    /// keeps operating with degraded durability.
    #[inline]
    #[must_use]
    pub const fn is_persistence_error(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Io(_))
    }
}

impl From<reqwest::Error> for ScanlinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ScanlinkError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidBaseUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ScanlinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_transport_error_classification() {
        assert!(ScanlinkError::Network("refused".into()).is_transport_error());
        assert!(ScanlinkError::Server {
            status: 500,
            message: "boom".into()
        }
        .is_transport_error());
        assert!(ScanlinkError::Timeout.is_transport_error());

        assert!(!ScanlinkError::Persistence("full".into()).is_transport_error());
    }

    #[test]
    fn test_persistence_error_classification() {
        assert!(ScanlinkError::Persistence("quota exceeded".into()).is_persistence_error());
        assert!(
            ScanlinkError::Io(IoErr::new(ErrorKind::NotFound, "missing")).is_persistence_error()
        );

        assert!(!ScanlinkError::Timeout.is_persistence_error());
    }

    #[test]
    fn test_server_error_display() {
        let err = ScanlinkError::Server {
            status: 503,
            message: "maintenance window".into(),
        };
        let text = err.to_string();
        assert!(text.contains("503"));
        assert!(text.contains("maintenance window"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ScanlinkError>();
        assert_sync::<ScanlinkError>();
    }
}
