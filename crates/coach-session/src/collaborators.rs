//! Seams to the external scoring, feedback, generation and clarification
//! services.
//!
//! The session only consumes these; implementations live in `coach-llm`
//! (HTTP) and [`crate::mock`] (scripted).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use coach_retrieval::FollowupPattern;
use coach_types::FollowupCategory;

/// Failure of an external collaborator call.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Score {0} is outside 1..=5")]
    OutOfRange(i64),
}

/// Everything a generator needs to phrase one follow-up question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupRequest {
    pub question: String,
    pub answer: String,
    pub quality_score: u8,
    pub feedback: String,
    pub category: FollowupCategory,

    /// Resolved concept id, "general" when none matched
    pub concept_id: String,

    #[serde(default)]
    pub key_points: Vec<String>,

    #[serde(default)]
    pub red_flags: Vec<String>,

    /// Retrieved patterns, most relevant first
    #[serde(default)]
    pub patterns: Vec<FollowupPattern>,
}

/// A student's question about the interview question itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarificationRequest {
    pub question: String,

    /// Latest answer on the thread, empty if none yet
    pub answer: String,

    pub student_question: String,

    /// Rendered concept knowledge for grounding
    pub context: String,
}

/// Scores an answer 1..=5.
#[async_trait]
pub trait AnswerScorer: Send + Sync {
    async fn score(&self, question: &str, answer: &str) -> Result<u8, CollaboratorError>;
}

/// Writes prose feedback on an answer. `iteration` is the 1-based attempt number.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn feedback(
        &self,
        question: &str,
        answer: &str,
        iteration: u32,
    ) -> Result<String, CollaboratorError>;
}

/// Phrases a follow-up question grounded on retrieved patterns.
#[async_trait]
pub trait FollowupGenerator: Send + Sync {
    async fn generate(&self, request: &FollowupRequest) -> Result<String, CollaboratorError>;
}

/// Answers a student's clarification question.
#[async_trait]
pub trait ClarificationProvider: Send + Sync {
    async fn clarify(&self, request: &ClarificationRequest) -> Result<String, CollaboratorError>;
}
