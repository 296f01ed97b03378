//! Deterministic feature-hashing embedder.
//!
//! Maps lowercased word unigrams and bigrams into a fixed number of signed
//! buckets with FNV-1a. Needs no model files and yields the same vector for
//! the same text on every platform, which keeps retrieval rankings stable.

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Default width, matching all-MiniLM-L6-v2 so either backend fits the same corpus tooling
pub const DEFAULT_HASH_DIM: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    info: ModelInfo,
}

impl HashEmbedder {
    /// Create an embedder producing `dimension`-wide vectors.
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "embedding dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            info: ModelInfo {
                name: format!("feature-hash-{}", dimension),
                dimension,
                max_sequence_length: usize::MAX,
            },
        })
    }

    fn accumulate(&self, feature: &str, weight: f32, vector: &mut [f32]) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % vector.len() as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            info: ModelInfo {
                name: format!("feature-hash-{}", DEFAULT_HASH_DIM),
                dimension: DEFAULT_HASH_DIM,
                max_sequence_length: usize::MAX,
            },
        }
    }
}

impl EmbeddingModel for HashEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.info.dimension];

        for token in &tokens {
            self.accumulate(token, UNIGRAM_WEIGHT, &mut vector);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&bigram, BIGRAM_WEIGHT, &mut vector);
        }

        Ok(Embedding::new(vector))
    }
}

/// Lowercased alphanumeric words.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
