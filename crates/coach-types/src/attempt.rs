//! Attempts and the per-question thread.
//!
//! A [`SessionThread`] is the append-only log of answers submitted against
//! the currently active question. Attempts are only mutated after the fact
//! to attach a follow-up, its answer, or to mark it skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::concept::FollowupCategory;

/// One scored answer submission within a question's thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based, assigned by the thread on append
    pub attempt_number: u32,

    pub answer_text: String,

    /// Quality score in 1..=5
    pub quality_score: u8,

    pub feedback_text: String,

    /// True iff this attempt answers an explicit revision request
    pub is_revision: bool,

    /// Follow-up question asked after this attempt
    #[serde(default)]
    pub followup_text: Option<String>,

    #[serde(default)]
    pub followup_category: Option<FollowupCategory>,

    #[serde(default)]
    pub followup_answer_text: Option<String>,

    #[serde(default)]
    pub followup_quality: Option<u8>,

    /// Set when the respondent skipped the follow-up or it was superseded
    #[serde(default)]
    pub followup_skipped: bool,

    pub submitted_at: DateTime<Utc>,
}

impl Attempt {
    /// Create an attempt; the number is assigned when it is appended.
    pub fn new(
        answer_text: impl Into<String>,
        quality_score: u8,
        feedback_text: impl Into<String>,
        is_revision: bool,
    ) -> Self {
        Self {
            attempt_number: 0,
            answer_text: answer_text.into(),
            quality_score,
            feedback_text: feedback_text.into(),
            is_revision,
            followup_text: None,
            followup_category: None,
            followup_answer_text: None,
            followup_quality: None,
            followup_skipped: false,
            submitted_at: Utc::now(),
        }
    }

    /// A follow-up was asked and has neither been answered nor skipped.
    pub fn has_pending_followup(&self) -> bool {
        self.followup_text.is_some() && self.followup_answer_text.is_none() && !self.followup_skipped
    }
}

/// Ordered attempts for the currently active question.
///
/// Invariant: at most one attempt has a pending follow-up, and only the
/// latest one can.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionThread {
    attempts: Vec<Attempt>,
}

impl SessionThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt, numbering it after the current latest.
    ///
    /// A follow-up still pending on the previous attempt is marked skipped,
    /// so the single-pending invariant holds. Callers that must refuse new
    /// attempts while a follow-up is pending check
    /// [`has_pending_followup`](Self::has_pending_followup) first.
    pub fn append(&mut self, mut attempt: Attempt) -> u32 {
        if let Some(previous) = self.attempts.last_mut() {
            if previous.has_pending_followup() {
                previous.followup_skipped = true;
            }
        }
        attempt.attempt_number = self.attempts.len() as u32 + 1;
        let number = attempt.attempt_number;
        self.attempts.push(attempt);
        number
    }

    pub fn latest(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// Previous attempt (the one before the latest).
    pub fn previous(&self) -> Option<&Attempt> {
        self.attempts.iter().rev().nth(1)
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn has_pending_followup(&self) -> bool {
        self.latest().map(Attempt::has_pending_followup).unwrap_or(false)
    }

    /// Store a follow-up question on the latest attempt.
    ///
    /// Returns false when the thread is empty.
    pub fn set_followup(&mut self, text: impl Into<String>, category: FollowupCategory) -> bool {
        match self.attempts.last_mut() {
            Some(latest) => {
                latest.followup_text = Some(text.into());
                latest.followup_category = Some(category);
                latest.followup_answer_text = None;
                latest.followup_quality = None;
                latest.followup_skipped = false;
                true
            }
            None => false,
        }
    }

    /// Attach the answer to the pending follow-up of the latest attempt.
    ///
    /// Returns `None` (and changes nothing) when no follow-up is pending.
    pub fn attach_followup_answer(
        &mut self,
        text: impl Into<String>,
        quality: u8,
    ) -> Option<&Attempt> {
        let latest = self.attempts.last_mut()?;
        if !latest.has_pending_followup() {
            return None;
        }
        latest.followup_answer_text = Some(text.into());
        latest.followup_quality = Some(quality);
        Some(latest)
    }

    /// Mark the pending follow-up as skipped. Returns false if none was pending.
    pub fn skip_pending_followup(&mut self) -> bool {
        match self.attempts.last_mut() {
            Some(latest) if latest.has_pending_followup() => {
                latest.followup_skipped = true;
                true
            }
            _ => false,
        }
    }

    /// Score change of the latest attempt over the one before it.
    pub fn improvement(&self) -> Option<i16> {
        let latest = self.latest()?;
        let previous = self.previous()?;
        Some(latest.quality_score as i16 - previous.quality_score as i16)
    }

    /// Clear the thread for a new question.
    pub fn reset(&mut self) {
        self.attempts.clear();
    }
}
