//! Error types for the llm module

use thiserror::Error;

use crate::error::Error as CrateError;

/// Error type for completion calls
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid request or response JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimit {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Operation not supported by the endpoint
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// API error
    #[error("API error ({status_code}): {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// The response did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Every configured API key failed
    #[error("All {keys} API keys failed")]
    Exhausted {
        /// Number of keys tried
        keys: usize,
    },

    /// No model is configured
    #[error("No language model configured")]
    NotConfigured,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<LlmError> for CrateError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) => CrateError::Http(e),
            LlmError::Json(e) => CrateError::Json(e),
            other => CrateError::Llm(other.to_string()),
        }
    }
}
