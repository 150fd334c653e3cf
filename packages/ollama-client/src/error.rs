//! Error types for the Ollama client.

use std::time::Duration;

use thiserror::Error;

/// Result type for Ollama client operations.
pub type Result<T> = std::result::Result<T, OllamaError>;

/// Ollama client errors.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// Configuration error (invalid base URL, bad settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection refused, DNS failure or any other transport failure
    #[error("Ollama unreachable: {0}")]
    Unreachable(String),

    /// Request exceeded the configured timeout
    #[error("Ollama request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body was not the expected JSON shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OllamaError {
    /// True when the server could not be contacted at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, OllamaError::Unreachable(_))
    }
}
