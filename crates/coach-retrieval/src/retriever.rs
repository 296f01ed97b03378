//! Follow-up pattern retrieval.
//!
//! Ranks corpus entries against an embedded (question, answer) query:
//!
//! 1. Embed `"{question} {answer}"` with the corpus's model.
//! 2. Resolve the question's concept through the [`ConceptIndex`].
//! 3. If the concept is not "general" and the corpus has entries for it,
//!    only those entries are eligible; otherwise the whole corpus is.
//! 4. Blend: `0.85 * (cos + 1) / 2 + 0.10 * concept_match + 0.05 * category_match`.
//! 5. Sort by blended score, ties by canonical corpus order, keep `top_k`.
//!
//! Retrieval never fails; problems degrade to fewer (or zero) results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use coach_embeddings::EmbeddingModel;
use coach_types::{FollowupCategory, GENERAL_CONCEPT};

use crate::concept_index::ConceptIndex;
use crate::corpus::{FollowupPattern, PatternCorpus};

/// Patterns returned per retrieval unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Weight of rescaled cosine similarity in the blended score
pub const SIMILARITY_WEIGHT: f32 = 0.85;

/// Boost for entries of the resolved concept
pub const CONCEPT_WEIGHT: f32 = 0.10;

/// Boost for entries of the desired follow-up category
pub const CATEGORY_WEIGHT: f32 = 0.05;

/// A retrieved pattern with the numbers that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPattern {
    pub pattern: FollowupPattern,

    /// Position in the corpus's canonical order
    pub index: usize,

    /// Raw cosine similarity in [-1, 1]
    pub similarity: f32,

    /// Blended score in [0, 1]
    pub score: f32,
}

/// Embedding-based follow-up retriever.
///
/// Holds shared read-only handles; clone freely across sessions.
#[derive(Clone)]
pub struct FollowupRetriever {
    corpus: Arc<PatternCorpus>,
    concepts: Arc<ConceptIndex>,
    model: Arc<dyn EmbeddingModel>,
}

impl FollowupRetriever {
    /// The corpus must have been embedded with `model`.
    pub fn new(
        corpus: Arc<PatternCorpus>,
        concepts: Arc<ConceptIndex>,
        model: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            corpus,
            concepts,
            model,
        }
    }

    pub fn corpus(&self) -> &PatternCorpus {
        &self.corpus
    }

    pub fn concepts(&self) -> &ConceptIndex {
        &self.concepts
    }

    /// Retrieve up to `top_k` patterns, most relevant first.
    pub fn retrieve(
        &self,
        original_question: &str,
        candidate_answer: &str,
        desired_category: FollowupCategory,
        top_k: usize,
    ) -> Vec<ScoredPattern> {
        if self.corpus.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query_text = format!("{} {}", original_question, candidate_answer);
        let query = match self.model.embed(&query_text) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Query embedding failed; returning no patterns");
                return Vec::new();
            }
        };

        let concept_id = self.concepts.concept_id_for(original_question);
        let restrict = concept_id != GENERAL_CONCEPT && self.corpus.has_concept(concept_id);

        let mut candidates: Vec<ScoredPattern> = self
            .corpus
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| !restrict || entry.concept_id == concept_id)
            .map(|(index, entry)| {
                let similarity = query.cosine_similarity(&entry.embedding);
                let concept_match = if entry.concept_id == concept_id { 1.0 } else { 0.0 };
                let category_match = if entry.category == desired_category.as_str() {
                    1.0
                } else {
                    0.0
                };
                let score = SIMILARITY_WEIGHT * (similarity + 1.0) / 2.0
                    + CONCEPT_WEIGHT * concept_match
                    + CATEGORY_WEIGHT * category_match;

                ScoredPattern {
                    pattern: entry.to_pattern(),
                    index,
                    similarity,
                    score,
                }
            })
            .collect();

        if candidates.is_empty() {
            return Vec::new();
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        candidates.truncate(top_k);

        debug!(
            concept = concept_id,
            restricted = restrict,
            category = %desired_category,
            returned = candidates.len(),
            "Retrieved follow-up patterns"
        );

        candidates
    }
}
