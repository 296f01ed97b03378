//! Retrieval error types.

use thiserror::Error;

/// Errors raised while loading the pattern corpus.
///
/// Retrieval itself never fails; only building the corpus can.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// IO error reading the corpus source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source is not valid JSON
    #[error("Invalid corpus JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Source is JSON but not concept -> category -> [pattern]
    #[error("Malformed corpus source: {0}")]
    Malformed(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] coach_embeddings::EmbeddingError),
}
