//! Session error types.

use thiserror::Error;

/// Invalid-state signals from [`InterviewSession`](crate::InterviewSession).
///
/// None of these end the session; the caller re-prompts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No question selected")]
    NoQuestion,

    #[error("Answer is blank")]
    BlankAnswer,

    #[error("A follow-up is pending; answer or skip it first")]
    FollowupPending,

    #[error("No follow-up is pending")]
    NothingPending,

    #[error("No answer has been submitted for this question")]
    NoAttempt,

    #[error("A follow-up was already asked for the latest answer")]
    FollowupAlreadyAsked,

    #[error("Clarification question must be at least {min} characters")]
    InvalidClarification { min: usize },
}
