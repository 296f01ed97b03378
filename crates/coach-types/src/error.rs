//! Errors from loading settings and data files.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoachError {
    /// Settings could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// A data file (question bank, corpus) is not valid JSON for its shape
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required file or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}
