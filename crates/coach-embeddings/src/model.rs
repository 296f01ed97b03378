//! Unit vectors and the backend trait shared by corpus and query embedding.

use crate::error::EmbeddingError;

/// A unit-length vector, or all zeros for text with no features.
///
/// Because every non-zero embedding has length one, the dot product of two
/// embeddings is their cosine similarity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Normalize `values` to unit length. A zero vector stays zero.
    pub fn new(mut values: Vec<f32>) -> Self {
        let norm = l2_norm(&values);
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Cosine similarity in [-1, 1]; 0.0 when the dimensions differ.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.dimension() != other.dimension() {
            return 0.0;
        }
        let dot: f32 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .sum();
        // Rounding can push the dot product of unit vectors just past 1.
        dot.clamp(-1.0, 1.0)
    }
}

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Name and shape of a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub dimension: usize,
    /// Longer inputs are truncated; `usize::MAX` for backends without a limit
    pub max_sequence_length: usize,
}

/// A text embedding backend.
///
/// The corpus and the queries against it must go through the same model.
/// Implementations are deterministic and shared across sessions, hence
/// `Send + Sync`.
pub trait EmbeddingModel: Send + Sync {
    fn info(&self) -> &ModelInfo;

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Embed several texts, one vector per text in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes() {
        let emb = Embedding::new(vec![3.0, 4.0]);
        assert!((emb.values[0] - 0.6).abs() < 1e-6);
        assert!((emb.values[1] - 0.8).abs() < 1e-6);
        assert!((l2_norm(&emb.values) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_is_orthogonal_to_everything() {
        let zero = Embedding::new(vec![0.0; 3]);
        assert!(zero.is_zero());
        assert_eq!(zero.cosine_similarity(&Embedding::new(vec![1.0, 2.0, 3.0])), 0.0);
    }

    #[test]
    fn test_cosine_bounds() {
        let a = Embedding::new(vec![1.0, 1.0]);
        let same = Embedding::new(vec![2.0, 2.0]);
        let opposite = Embedding::new(vec![-1.0, -1.0]);
        assert!((a.cosine_similarity(&same) - 1.0).abs() < 1e-6);
        assert!((a.cosine_similarity(&opposite) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
        assert!(Embedding::default().is_zero());
    }
}
