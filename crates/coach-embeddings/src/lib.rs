//! # coach-embeddings
//!
//! Text embeddings for follow-up pattern retrieval.
//!
//! Every pattern in the corpus and every (question, answer) query is turned
//! into a unit vector so that a dot product is cosine similarity.
//!
//! ## Backends
//! - [`HashEmbedder`]: deterministic feature hashing, no downloads (default)
//! - [`CandleEmbedder`]: all-MiniLM-L6-v2 via Candle, 384 dimensions,
//!   model files cached locally after the first download

pub mod cache;
pub mod candle;
pub mod error;
pub mod hashing;
pub mod model;

pub use crate::candle::{CandleEmbedder, EMBEDDING_DIM};
pub use cache::{ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use hashing::{HashEmbedder, DEFAULT_HASH_DIM};
pub use model::{Embedding, EmbeddingModel, ModelInfo};
