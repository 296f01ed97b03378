//! End-to-end test infrastructure for the interview coach.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the answer-to-follow-up pipeline: corpus load, concept
//! resolution, retrieval, turn policy, and the session thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use coach_embeddings::{Embedding, EmbeddingError, EmbeddingModel, HashEmbedder, ModelInfo};
use coach_retrieval::{ConceptIndex, FollowupRetriever, PatternCorpus};
use coach_session::{
    Collaborators, InterviewSession, MockClarifier, MockFeedback, MockGenerator, MockScorer,
    SessionConfig,
};
use coach_types::Question;

/// Corpus shipped with the binary, relative to the workspace root.
pub const SHIPPED_PATTERNS: &str = "data/followup_patterns.json";

/// Question bank shipped with the binary, relative to the workspace root.
pub const SHIPPED_QUESTIONS: &str = "data/questions.json";

/// Two p_value patterns and five general ones.
pub const P_VALUE_CORPUS: &str = r#"{
    "p_value": {
        "clarification": ["What exactly does a p-value of 0.03 tell you about the data?"],
        "gap_filling": ["How does sample size affect the p-value for the same effect?"]
    },
    "general": {
        "clarification": [
            "Could you restate your main point more precisely?",
            "What do you mean by that term in this context?"
        ],
        "gap_filling": ["Can you walk me through a concrete example?"],
        "advanced_application": [
            "How would this play out on a real project with messy data?",
            "How would you explain the business impact to a stakeholder?"
        ]
    }
}"#;

/// Maps every text to the same vector, so every similarity is 1.0 and
/// only the concept and category boosts separate entries.
pub struct ConstantEmbedder {
    info: ModelInfo,
}

impl ConstantEmbedder {
    pub fn new() -> Self {
        Self {
            info: ModelInfo {
                name: "constant".to_string(),
                dimension: 8,
                max_sequence_length: usize::MAX,
            },
        }
    }
}

impl Default for ConstantEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for ConstantEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(Embedding::new(vec![1.0; 8]))
    }
}

/// Shared test harness for E2E tests.
///
/// Holds a temp dir for on-disk corpora and the embedding model every
/// retriever built by the harness shares.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Where `write_corpus` puts pattern files
    pub data_dir: PathBuf,
    /// Embedding model for corpus and queries
    pub model: Arc<dyn EmbeddingModel>,
}

impl TestHarness {
    /// Harness using the feature-hashing embedder.
    pub fn new() -> Self {
        Self::with_model(Arc::new(HashEmbedder::default()))
    }

    /// Harness using a caller-supplied embedding model.
    pub fn with_model(model: Arc<dyn EmbeddingModel>) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        Self {
            _temp_dir: temp_dir,
            data_dir,
            model,
        }
    }

    /// Write a pattern corpus to the harness data dir and return its path.
    pub fn write_corpus(&self, json: &str) -> PathBuf {
        let path = self.data_dir.join("followup_patterns.json");
        std::fs::write(&path, json).expect("Failed to write corpus");
        path
    }

    /// Build a retriever over an in-memory JSON corpus.
    pub fn retriever(&self, corpus_json: &str) -> FollowupRetriever {
        let corpus = PatternCorpus::from_json_str(corpus_json, self.model.as_ref())
            .expect("Failed to load corpus");
        self.wrap(corpus)
    }

    /// Build a retriever over a corpus file; a missing file gives an empty corpus.
    pub fn retriever_from_path(&self, path: &Path) -> FollowupRetriever {
        let corpus =
            PatternCorpus::from_path(path, self.model.as_ref()).expect("Failed to load corpus");
        self.wrap(corpus)
    }

    /// Build a session over `corpus_json` with the given collaborators.
    pub fn session(
        &self,
        corpus_json: &str,
        collaborators: Collaborators,
        config: SessionConfig,
    ) -> InterviewSession {
        InterviewSession::new(self.retriever(corpus_json), collaborators, config)
    }

    fn wrap(&self, corpus: PatternCorpus) -> FollowupRetriever {
        FollowupRetriever::new(
            Arc::new(corpus),
            Arc::new(ConceptIndex::builtin()),
            self.model.clone(),
        )
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Collaborators that return `scores` in order, then `then`, with the
/// given feedback text on every answer.
pub fn scripted_collaborators(
    scores: impl IntoIterator<Item = u8>,
    then: u8,
    feedback: &str,
) -> Collaborators {
    Collaborators::new(
        Arc::new(MockScorer::scripted(scores, then)),
        Arc::new(MockFeedback::with_text(feedback)),
        Arc::new(MockGenerator::new()),
        Arc::new(MockClarifier::new()),
    )
}

/// A statistics question that resolves to the p_value concept.
pub fn p_value_question() -> Question {
    Question::new("statistics", "What is a p-value and how should it be interpreted?")
}

/// Path of a file under the workspace root.
pub fn workspace_file(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}
