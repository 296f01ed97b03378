//! # coach-session
//!
//! Turn policy and session orchestration for the interview coach.
//!
//! A submitted answer is scored by an external [`AnswerScorer`], the
//! [`TurnPolicy`] decides between a revision request, a follow-up, or ending
//! the turn, and for a follow-up the [`FollowupClassifier`] picks a category
//! that steers retrieval. [`InterviewSession`] ties these together and keeps
//! the per-question [`SessionThread`](coach_types::SessionThread).
//!
//! ## Gating modes
//!
//! - **Strict** (default): weak first answers get a revision request; one
//!   pending follow-up at a time.
//! - **Permissive**: no revision requests; a new attempt supersedes a
//!   pending follow-up.

pub mod classifier;
pub mod collaborators;
pub mod error;
pub mod fallback;
pub mod mock;
pub mod policy;
pub mod session;

pub use classifier::{
    classify_followup_type, CategoryDecision, ClassifierConfig, FollowupClassifier,
};
pub use collaborators::{
    AnswerScorer, ClarificationProvider, ClarificationRequest, CollaboratorError,
    FeedbackProvider, FollowupGenerator, FollowupRequest,
};
pub use error::SessionError;
pub use fallback::{fallback_followup, FollowupSource, GENERIC_FOLLOWUP};
pub use mock::{MockClarifier, MockFeedback, MockGenerator, MockScorer};
pub use policy::{TurnAction, TurnDecision, TurnPolicy};
pub use session::{
    Collaborators, FollowupOutcome, InterviewSession, QuestionRecord, SessionConfig,
    SessionState, TurnOutcome, CLARIFICATION_FALLBACK, CLARIFICATION_MIN_CHARS,
};
