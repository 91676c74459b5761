//! Error types for namecheck
//!
//! Availability outcomes (taken, unknown, rate limited, ...) are data, carried
//! in [`crate::types::Availability`]. The variants here are reserved for
//! failures that stop an operation: bad input, storage I/O, provider errors
//! in strict mode and cancellation.

use thiserror::Error;

/// Result type alias for namecheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for namecheck
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (empty name, empty profile, bad settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A checker failed to produce an answer
    #[error("Checker error ({checker}): {message}")]
    Checker {
        /// Check type or checker name
        checker: String,
        /// Error message
        message: String,
    },

    /// Rate-limit or cache storage errors
    #[error("Store error: {0}")]
    Store(String),

    /// HTTP transport errors (from checker implementations)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a checker error
    pub fn checker(checker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Checker {
            checker: checker.into(),
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Whether this error came from configuration or input validation
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidInput(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
