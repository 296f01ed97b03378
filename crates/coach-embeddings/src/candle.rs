//! all-MiniLM-L6-v2 sentence embeddings on the CPU through Candle.
//!
//! Token states are mean-pooled over the attention mask and normalized,
//! giving 384-dimensional unit vectors. Large inputs (the whole pattern
//! corpus at startup) are embedded in fixed-size chunks so padding stays
//! bounded by the longest text in each chunk rather than in the corpus.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use crate::cache::{ModelCache, ModelPaths};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

pub const EMBEDDING_DIM: usize = 384;

/// Tokens kept per text; follow-up patterns and answers are far shorter.
pub const MAX_SEQ_LENGTH: usize = 256;

/// Texts per forward pass.
pub const CHUNK_SIZE: usize = 32;

pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load from the default cache, downloading missing files first.
    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let paths = cache.ensure()?;
        Self::from_paths(&paths)
    }

    pub fn from_paths(paths: &ModelPaths) -> Result<Self, EmbeddingError> {
        let device = Device::Cpu;

        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&paths.config)?)
            .map_err(|e| EmbeddingError::InvalidModel(format!("config.json: {}", e)))?;
        let tokenizer = Tokenizer::from_file(&paths.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the cached weights file is only written before loading
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[paths.weights.clone()], DType::F32, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        info!(dim = EMBEDDING_DIM, "Loaded all-MiniLM-L6-v2");
        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name: "all-MiniLM-L6-v2".to_string(),
                dimension: EMBEDDING_DIM,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

    /// One forward pass over at most `CHUNK_SIZE` texts.
    fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let (ids, mask) = padded_inputs(&encodings, &self.device)?;
        let token_types = ids.zeros_like()?;
        let hidden = self.model.forward(&ids, &token_types, Some(&mask))?;

        let rows: Vec<Vec<f32>> = mean_pool(&hidden, &mask)?.to_vec2()?;
        Ok(rows.into_iter().map(Embedding::new).collect())
    }
}

/// Truncate to `MAX_SEQ_LENGTH` and right-pad every encoding to the chunk's
/// longest, returning `(input_ids, attention_mask)` tensors.
fn padded_inputs(encodings: &[Encoding], device: &Device) -> Result<(Tensor, Tensor), EmbeddingError> {
    let width = encodings
        .iter()
        .map(|e| e.get_ids().len().min(MAX_SEQ_LENGTH))
        .max()
        .unwrap_or(0);

    let mut ids = Vec::with_capacity(encodings.len() * width);
    let mut mask = Vec::with_capacity(encodings.len() * width);
    for encoding in encodings {
        let len = encoding.get_ids().len().min(width);
        ids.extend_from_slice(&encoding.get_ids()[..len]);
        mask.extend_from_slice(&encoding.get_attention_mask()[..len]);
        ids.resize(ids.len() + width - len, 0u32);
        mask.resize(mask.len() + width - len, 0u32);
    }

    let shape = (encodings.len(), width);
    Ok((
        Tensor::from_vec(ids, shape, device)?,
        Tensor::from_vec(mask, shape, device)?,
    ))
}

/// Average token states where the mask is set.
fn mean_pool(hidden: &Tensor, mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let weights = mask
        .unsqueeze(2)?
        .broadcast_as(hidden.shape())?
        .to_dtype(DType::F32)?;
    let summed = hidden.broadcast_mul(&weights)?.sum(1)?;
    let counts = weights.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok(summed.broadcast_div(&counts)?)
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let out = self.embed_chunk(&[text])?;
        let actual = out.len();
        match (actual, out.into_iter().next()) {
            (1, Some(embedding)) => Ok(embedding),
            _ => Err(EmbeddingError::BatchMismatch {
                expected: 1,
                actual,
            }),
        }
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(CHUNK_SIZE) {
            embeddings.extend(self.embed_chunk(chunk)?);
        }
        debug!(texts = texts.len(), "Embedded batch");

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::BatchMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires model download"]
    fn test_embed_question() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let emb = embedder.embed("What is a p-value?").unwrap();
        assert_eq!(emb.dimension(), EMBEDDING_DIM);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_batch_spans_chunks_in_order() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let texts: Vec<String> = (0..CHUNK_SIZE + 3)
            .map(|i| format!("follow-up pattern number {}", i))
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let batch = embedder.embed_batch(&refs).unwrap();
        assert_eq!(batch.len(), refs.len());
        let last = embedder.embed(refs[refs.len() - 1]).unwrap();
        assert!(batch[refs.len() - 1].cosine_similarity(&last) > 0.999);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_related_question_is_closer() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let q = embedder.embed("Explain the central limit theorem").unwrap();
        let near = embedder
            .embed("Why do sample means become normally distributed?")
            .unwrap();
        let far = embedder.embed("How do you tune a learning rate?").unwrap();
        assert!(q.cosine_similarity(&near) > q.cosine_similarity(&far));
    }
}
