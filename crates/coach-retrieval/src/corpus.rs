//! Follow-up pattern corpus.
//!
//! The source is a nested JSON object `concept -> category -> [pattern]`.
//! Flattening walks concepts, then categories, then patterns in source
//! order; that traversal order is the corpus's canonical order and decides
//! ties during retrieval. Every entry is embedded once at load time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use coach_embeddings::{Embedding, EmbeddingModel};

use crate::error::RetrievalError;

/// A follow-up pattern handed to generation or shown as a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupPattern {
    pub concept_id: String,
    pub category: String,
    pub text: String,
}

/// One corpus entry: a pattern plus its unit-normalized embedding.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub concept_id: String,
    pub category: String,
    pub text: String,
    /// Empty until [`PatternCorpus::embed_all`] runs
    pub embedding: Embedding,
}

impl PatternEntry {
    pub fn new(
        concept_id: impl Into<String>,
        category: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            concept_id: concept_id.into(),
            category: category.into(),
            text: text.into(),
            embedding: Embedding::default(),
        }
    }

    pub fn to_pattern(&self) -> FollowupPattern {
        FollowupPattern {
            concept_id: self.concept_id.clone(),
            category: self.category.clone(),
            text: self.text.clone(),
        }
    }
}

/// Embedded patterns in canonical order. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct PatternCorpus {
    entries: Vec<PatternEntry>,
}

impl PatternCorpus {
    /// Corpus with no patterns; every retrieval returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flatten a nested source into unembedded entries in canonical order.
    pub fn load(source: &Value) -> Result<Vec<PatternEntry>, RetrievalError> {
        let concepts = match source {
            Value::Object(map) => map,
            Value::Null => return Ok(Vec::new()),
            other => {
                return Err(RetrievalError::Malformed(format!(
                    "expected an object of concepts, found {}",
                    json_kind(other)
                )))
            }
        };

        let mut entries = Vec::new();
        for (concept_id, categories) in concepts {
            let Value::Object(categories) = categories else {
                return Err(RetrievalError::Malformed(format!(
                    "concept '{}' must map categories to pattern lists, found {}",
                    concept_id,
                    json_kind(categories)
                )));
            };

            for (category, patterns) in categories {
                let Value::Array(patterns) = patterns else {
                    return Err(RetrievalError::Malformed(format!(
                        "'{}.{}' must be a list of patterns, found {}",
                        concept_id,
                        category,
                        json_kind(patterns)
                    )));
                };

                for pattern in patterns {
                    let Value::String(text) = pattern else {
                        return Err(RetrievalError::Malformed(format!(
                            "'{}.{}' contains a non-string pattern",
                            concept_id, category
                        )));
                    };
                    entries.push(PatternEntry::new(concept_id, category, text));
                }
            }
        }

        Ok(entries)
    }

    /// Assign an embedding to every entry.
    pub fn embed_all(
        entries: &mut [PatternEntry],
        model: &dyn EmbeddingModel,
    ) -> Result<(), RetrievalError> {
        if entries.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        let embeddings = model.embed_batch(&texts)?;
        if embeddings.len() != entries.len() {
            return Err(RetrievalError::Malformed(format!(
                "embedder returned {} vectors for {} patterns",
                embeddings.len(),
                entries.len()
            )));
        }

        for (entry, embedding) in entries.iter_mut().zip(embeddings) {
            entry.embedding = embedding;
        }

        debug!(
            count = entries.len(),
            model = %model.info().name,
            "Embedded corpus patterns"
        );
        Ok(())
    }

    /// Build from an in-memory nested source.
    pub fn from_source(source: &Value, model: &dyn EmbeddingModel) -> Result<Self, RetrievalError> {
        let mut entries = Self::load(source)?;
        Self::embed_all(&mut entries, model)?;
        Ok(Self { entries })
    }

    pub fn from_json_str(json: &str, model: &dyn EmbeddingModel) -> Result<Self, RetrievalError> {
        let source: Value = serde_json::from_str(json)?;
        Self::from_source(&source, model)
    }

    /// Load from a JSON file. A missing file gives an empty corpus.
    pub fn from_path(
        path: impl AsRef<Path>,
        model: &dyn EmbeddingModel,
    ) -> Result<Self, RetrievalError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Pattern corpus not found; using empty corpus");
            return Ok(Self::empty());
        }

        let json = std::fs::read_to_string(path)?;
        let corpus = Self::from_json_str(&json, model)?;
        info!(
            path = %path.display(),
            patterns = corpus.len(),
            "Loaded follow-up pattern corpus"
        );
        Ok(corpus)
    }

    /// Build from entries that are already embedded.
    pub fn from_entries(entries: Vec<PatternEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_concept(&self, concept_id: &str) -> bool {
        self.entries.iter().any(|e| e.concept_id == concept_id)
    }

    /// Pattern texts of one concept/category bucket, in source order.
    pub fn patterns_for(&self, concept_id: &str, category: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.concept_id == concept_id && e.category == category)
            .map(|e| e.text.as_str())
            .collect()
    }

    /// Distinct concept ids in canonical order.
    pub fn concept_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.concept_id.as_str()) {
                ids.push(&entry.concept_id);
            }
        }
        ids
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_embeddings::HashEmbedder;

    const SOURCE: &str = r#"{
        "p_value": {
            "clarification": ["What does a p-value of 0.03 mean?", "Is p the chance H0 is true?"],
            "gap_filling": ["How does sample size affect p-values?"]
        },
        "general": {
            "gap_filling": ["Can you give an example?"]
        }
    }"#;

    #[test]
    fn test_flatten_preserves_source_order() {
        let source: Value = serde_json::from_str(SOURCE).unwrap();
        let entries = PatternCorpus::load(&source).unwrap();
        let order: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.concept_id.as_str(), e.category.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("p_value", "clarification"),
                ("p_value", "clarification"),
                ("p_value", "gap_filling"),
                ("general", "gap_filling"),
            ]
        );
        assert_eq!(entries[1].text, "Is p the chance H0 is true?");
    }

    #[test]
    fn test_embeddings_are_unit_and_deterministic() {
        let embedder = HashEmbedder::default();
        let first = PatternCorpus::from_json_str(SOURCE, &embedder).unwrap();
        let second = PatternCorpus::from_json_str(SOURCE, &embedder).unwrap();

        for (a, b) in first.entries().iter().zip(second.entries()) {
            assert_eq!(a.embedding, b.embedding);
            let norm: f32 = a.embedding.values.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_missing_file_is_empty_corpus() {
        let embedder = HashEmbedder::default();
        let corpus = PatternCorpus::from_path("/nonexistent/patterns.json", &embedder).unwrap();
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, SOURCE).unwrap();

        let corpus = PatternCorpus::from_path(&path, &HashEmbedder::default()).unwrap();
        assert_eq!(corpus.len(), 4);
        assert_eq!(corpus.concept_ids(), vec!["p_value", "general"]);
        assert!(corpus.has_concept("p_value"));
        assert_eq!(corpus.patterns_for("p_value", "clarification").len(), 2);
        assert!(corpus.patterns_for("p_value", "advanced_application").is_empty());
    }

    #[test]
    fn test_empty_sources() {
        let embedder = HashEmbedder::default();
        assert!(PatternCorpus::from_json_str("{}", &embedder).unwrap().is_empty());
        assert!(PatternCorpus::from_json_str("null", &embedder).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_sources() {
        let embedder = HashEmbedder::default();
        assert!(matches!(
            PatternCorpus::from_json_str("[1, 2]", &embedder),
            Err(RetrievalError::Malformed(_))
        ));
        assert!(matches!(
            PatternCorpus::from_json_str(r#"{"p_value": ["x"]}"#, &embedder),
            Err(RetrievalError::Malformed(_))
        ));
        assert!(matches!(
            PatternCorpus::from_json_str(r#"{"p_value": {"gap_filling": [3]}}"#, &embedder),
            Err(RetrievalError::Malformed(_))
        ));
        assert!(matches!(
            PatternCorpus::from_json_str("{not json", &embedder),
            Err(RetrievalError::Json(_))
        ));
    }
}
