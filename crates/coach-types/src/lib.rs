//! # coach-types
//!
//! Shared domain types for the interview coach.
//!
//! This crate defines the core data structures used throughout the system:
//! - Concepts: Read-only knowledge records and follow-up categories
//! - Attempts: Scored answers and the per-question thread
//! - Questions: Question bank entries and quality labels
//! - Settings: Layered configuration

pub mod attempt;
pub mod concept;
pub mod config;
pub mod error;
pub mod question;

pub use attempt::{Attempt, SessionThread};
pub use concept::{ConceptRecord, FollowupCategory, GENERAL_CONCEPT};
pub use config::{EmbedderKind, GatingMode, LlmProvider, LlmSettings, Settings};
pub use error::CoachError;
pub use question::{quality_label, Question};
