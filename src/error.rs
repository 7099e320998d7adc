//! Error types for the orgbot crate

use thiserror::Error;

/// Result type for orgbot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for orgbot operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Knowledge base error
    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Conversation history error
    #[error("History error: {0}")]
    History(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
