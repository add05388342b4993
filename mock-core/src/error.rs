//! Error types for mocking operations
//!
//! Request matching itself never fails: malformed URLs, invalid JSON bodies and
//! unknown match types all degrade locally. These errors cover the surfaces
//! around the engine (rule loading, certificates, proxy and admin startup).

use thiserror::Error;

/// Main error type for mock operations
#[derive(Debug, Error)]
pub enum MockError {
    /// Rule list could not be parsed or validated
    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Certificate-related errors
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),

    /// General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MockError {
    fn from(err: serde_json::Error) -> Self {
        MockError::InvalidRules(err.to_string())
    }
}
