//! Interview turn decision policy.
//!
//! Strict mode evaluates, in order:
//! 1. `score <= 2 && !is_revision` -> `RequestRevision`
//! 2. `score >= 5` -> `None`
//! 3. `score >= 3 || is_revision` -> `AskFollowup`
//! 4. otherwise -> `None`
//!
//! Permissive mode skips rule 1, so a weak first answer ends the turn
//! instead of asking for a revision.

use serde::{Deserialize, Serialize};
use tracing::debug;

use coach_types::{FollowupCategory, GatingMode};

use crate::classifier::FollowupClassifier;

/// What the session should do after scoring an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnAction {
    /// Withhold any follow-up; re-prompt for the same question
    RequestRevision,
    /// Classify, retrieve and ask a follow-up
    AskFollowup,
    /// The turn is complete
    None,
}

impl TurnAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnAction::RequestRevision => "REQUEST_REVISION",
            TurnAction::AskFollowup => "ASK_FOLLOWUP",
            TurnAction::None => "NONE",
        }
    }
}

impl std::fmt::Display for TurnAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDecision {
    pub action: TurnAction,

    /// Set only for [`TurnAction::AskFollowup`]
    pub category: Option<FollowupCategory>,
}

impl TurnDecision {
    pub fn request_revision() -> Self {
        Self {
            action: TurnAction::RequestRevision,
            category: None,
        }
    }

    pub fn ask_followup(category: FollowupCategory) -> Self {
        Self {
            action: TurnAction::AskFollowup,
            category: Some(category),
        }
    }

    pub fn none() -> Self {
        Self {
            action: TurnAction::None,
            category: None,
        }
    }
}

/// Revision gate and follow-up decision.
#[derive(Debug, Clone, Default)]
pub struct TurnPolicy {
    gating: GatingMode,
    classifier: FollowupClassifier,
}

impl TurnPolicy {
    pub fn new(gating: GatingMode) -> Self {
        Self {
            gating,
            classifier: FollowupClassifier::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: FollowupClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn gating(&self) -> GatingMode {
        self.gating
    }

    pub fn classifier(&self) -> &FollowupClassifier {
        &self.classifier
    }

    /// Pick the next action from the latest score.
    pub fn decide(&self, quality_score: u8, is_revision: bool) -> TurnAction {
        let action = if self.gating == GatingMode::Strict && quality_score <= 2 && !is_revision {
            TurnAction::RequestRevision
        } else if quality_score >= 5 {
            TurnAction::None
        } else if quality_score >= 3 || is_revision {
            TurnAction::AskFollowup
        } else {
            TurnAction::None
        };

        debug!(
            score = quality_score,
            is_revision,
            gating = ?self.gating,
            action = %action,
            "Turn decision"
        );
        action
    }

    /// Decide and, for a follow-up, classify its category.
    pub fn evaluate(&self, quality_score: u8, feedback_text: &str, is_revision: bool) -> TurnDecision {
        match self.decide(quality_score, is_revision) {
            TurnAction::AskFollowup => {
                TurnDecision::ask_followup(self.classify(quality_score, feedback_text))
            }
            TurnAction::RequestRevision => TurnDecision::request_revision(),
            TurnAction::None => TurnDecision::none(),
        }
    }

    pub fn classify(&self, quality_score: u8, feedback_text: &str) -> FollowupCategory {
        self.classifier.classify(quality_score, feedback_text).category
    }
}
