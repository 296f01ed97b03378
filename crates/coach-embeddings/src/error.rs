//! Errors from loading an embedding backend or embedding text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Tensor or model failure inside candle
    #[error("Embedding backend error: {0}")]
    Backend(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model files present but unusable (bad config, missing tensors)
    #[error("Invalid model files: {0}")]
    InvalidModel(String),

    #[error("Model download failed: {0}")]
    Download(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid embedding input: {0}")]
    InvalidInput(String),

    /// The backend produced a different number of vectors than texts given
    #[error("Embedded {actual} vectors for {expected} texts")]
    BatchMismatch { expected: usize, actual: usize },
}
