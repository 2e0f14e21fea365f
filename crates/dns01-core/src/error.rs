//! Error types for the DNS-01 solver
//!
//! The variants follow the failure classes the solver has to tell apart:
//! transport failures, protocol failures (HTTP status, provider XML status,
//! malformed payloads), not-found conditions and credential store failures.

use thiserror::Error;

/// Result type alias for solver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS-01 solver
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failure or failure to read a response body
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-200 status, non-"success" provider status, or malformed payload
    #[error("Protocol error during {operation}: {message}")]
    Protocol {
        /// The API operation that failed (e.g. "create record")
        operation: String,
        /// Diagnostic message, including raw status/body where available
        message: String,
    },

    /// The provider rejected the access token or app credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone, service or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credential store read or write failure
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {elapsed_secs}s")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The deadline that was exceeded
        elapsed_secs: u64,
    },

    /// An operation was cancelled before it completed
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error for the given operation
    pub fn protocol(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a credential store error
    pub fn credential_store(msg: impl Into<String>) -> Self {
        Self::CredentialStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }
}
