//! Error types for the knowledge module

use thiserror::Error;

use crate::error::Error as CrateError;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid knowledge base JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid keyword pattern '{keyword}': {source}")]
    Pattern {
        keyword: String,
        #[source]
        source: regex::Error,
    },
}

impl From<KnowledgeError> for CrateError {
    fn from(err: KnowledgeError) -> Self {
        CrateError::Knowledge(err.to_string())
    }
}
