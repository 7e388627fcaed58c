//! Error types and handling for the customer client
//!
//! Provides structured error types for lookups, configuration and the contract
//! tooling. Absence of a customer is never an error: it is an `Ok(None)`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for customer client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Comprehensive error types for customer client operations
#[derive(Error, Debug)]
pub enum ClientError {
    // ═══════════════════════════════════════════════════════════════
    // Network & HTTP Errors
    // ═══════════════════════════════════════════════════════════════
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to connect to the customer service
    #[error("Failed to connect to {host}: {reason}")]
    ConnectionError { host: String, reason: String },

    /// Request could not be built from the configured host/port
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ═══════════════════════════════════════════════════════════════
    // Contract Breaches
    // ═══════════════════════════════════════════════════════════════
    /// Successful response whose body does not match the customer shape
    #[error("Response with status {status} violates the customer schema: {reason}")]
    SchemaViolation { status: u16, reason: String },

    // ═══════════════════════════════════════════════════════════════
    // Lookup Lifecycle
    // ═══════════════════════════════════════════════════════════════
    /// Lookup was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// No async runtime is available to drive the request
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    // ═══════════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════════
    /// Failed to read configuration file
    #[error("Failed to read config from {path}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ═══════════════════════════════════════════════════════════════
    // Contract Tooling
    // ═══════════════════════════════════════════════════════════════
    /// A regular-expression matcher is unusable
    #[error("Invalid matcher '{pattern}': {reason}")]
    InvalidMatcher { pattern: String, reason: String },

    /// Failed to read a pact document
    #[error("Failed to read pact from {path}: {reason}")]
    PactRead { path: PathBuf, reason: String },

    /// Failed to write a pact document
    #[error("Failed to write pact to {path}: {reason}")]
    PactWrite { path: PathBuf, reason: String },

    /// Mock server could not be started or stopped
    #[error("Mock server error: {0}")]
    MockServer(String),

    /// Interactions were not honoured
    #[error("Contract verification failed with {failures} failure(s):\n{summary}")]
    VerificationFailed { failures: usize, summary: String },

    // ═══════════════════════════════════════════════════════════════
    // Serialization & Encoding Errors
    // ═══════════════════════════════════════════════════════════════
    /// Failed to serialize data
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    /// Failed to deserialize data
    #[error("Deserialization failed: {0}")]
    DeserializationError(String),

    // ═══════════════════════════════════════════════════════════════
    // Other Errors
    // ═══════════════════════════════════════════════════════════════
    /// I/O failure outside configuration and pact files
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Get the exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig(_) | Self::ConfigRead { .. } | Self::InvalidUrl(_) => 2,
            Self::SchemaViolation { .. } => 3,
            Self::ConnectionError { .. } | Self::Http(_) => 4,
            Self::PactRead { .. } | Self::PactWrite { .. } | Self::InvalidMatcher { .. } => 5,
            Self::VerificationFailed { .. } | Self::MockServer(_) => 6,
            Self::Timeout(_) => 124,
            Self::Cancelled => 130,
            _ => 1,
        }
    }

    /// Whether the lookup itself could not reach or read from the provider
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError { .. } | Self::Http(_) | Self::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionError {
                host: err
                    .url()
                    .and_then(|url| url.host_str().map(str::to_string))
                    .unwrap_or_else(|| "<unknown>".to_string()),
                reason: err.to_string(),
            }
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() {
            Self::DeserializationError(format!("JSON syntax error: {err}"))
        } else {
            Self::DeserializationError(err.to_string())
        }
    }
}
