//! # coach-llm
//!
//! HTTP implementations of the interview coach's external collaborators.
//!
//! [`ApiCoach`] speaks either the OpenAI-compatible `/chat/completions`
//! protocol or Anthropic's `/messages` protocol and implements every
//! collaborator trait from `coach-session`: answer scoring, feedback,
//! follow-up generation and clarification. Calls are retried with
//! exponential backoff; scores are parsed from the first integer in the
//! reply and rejected outside 1..=5.

pub mod client;
pub mod prompts;

pub use client::{ApiCoach, ApiCoachConfig, ApiFlavor};
pub use prompts::parse_score;
