//! # coach-retrieval
//!
//! Concept lookup and follow-up pattern retrieval for the interview coach.
//!
//! ## Core Concepts
//!
//! - **ConceptIndex**: ordered keyword table resolving a question to a
//!   knowledge-base concept (first match wins)
//! - **PatternCorpus**: follow-up question templates tagged with concept
//!   and category, embedded once at load
//! - **FollowupRetriever**: blends cosine similarity with concept and
//!   category boosts and returns the top-k patterns
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coach_embeddings::HashEmbedder;
//! use coach_retrieval::{ConceptIndex, FollowupRetriever, PatternCorpus};
//! use coach_types::FollowupCategory;
//!
//! let model = Arc::new(HashEmbedder::default());
//! let corpus = PatternCorpus::from_path("data/followup_patterns.json", model.as_ref())?;
//! let retriever = FollowupRetriever::new(
//!     Arc::new(corpus),
//!     Arc::new(ConceptIndex::builtin()),
//!     model,
//! );
//! let patterns = retriever.retrieve(
//!     "What is a p-value?",
//!     "The probability the null is true",
//!     FollowupCategory::Clarification,
//!     3,
//! );
//! ```

pub mod concept_index;
pub mod corpus;
pub mod error;
pub mod retriever;

pub use concept_index::{ConceptIndex, NO_CONCEPT_CONTEXT};
pub use corpus::{FollowupPattern, PatternCorpus, PatternEntry};
pub use error::RetrievalError;
pub use retriever::{
    FollowupRetriever, ScoredPattern, CATEGORY_WEIGHT, CONCEPT_WEIGHT, DEFAULT_TOP_K,
    SIMILARITY_WEIGHT,
};
