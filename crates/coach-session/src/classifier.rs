//! Follow-up category classification.
//!
//! Rule table, evaluated in order:
//! - score >= 4: advanced application
//! - score <= 2: clarification
//! - score == 3: sniff the feedback text (lowercased substring containment,
//!   no word boundaries): a gap keyword ("missing", "add") means gap filling,
//!   else a clarity keyword ("unclear", "confusing") means clarification,
//!   else gap filling.
//!
//! The substring sniffing is intentionally crude ("address" contains "add")
//! and must stay that way; changing it changes which follow-ups are asked.

use serde::{Deserialize, Serialize};
use tracing::debug;

use coach_types::FollowupCategory;

/// Result of category classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDecision {
    pub category: FollowupCategory,

    /// Feedback keyword that decided a score-3 classification, if any
    pub matched_keyword: Option<String>,

    /// Explanation of why this category was chosen
    pub reason: String,
}

/// Configuration for category classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Feedback keywords signalling missing content (checked first)
    pub gap_keywords: Vec<String>,

    /// Feedback keywords signalling an unclear answer
    pub clarity_keywords: Vec<String>,

    /// Scores at or above this ask for advanced application
    pub advanced_min_score: u8,

    /// Scores at or below this ask for clarification
    pub clarification_max_score: u8,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            gap_keywords: vec!["missing".to_string(), "add".to_string()],
            clarity_keywords: vec!["unclear".to_string(), "confusing".to_string()],
            advanced_min_score: 4,
            clarification_max_score: 2,
        }
    }
}

/// Picks the follow-up category for a scored answer.
#[derive(Debug, Clone, Default)]
pub struct FollowupClassifier {
    config: ClassifierConfig,
}

impl FollowupClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut config: ClassifierConfig) -> Self {
        config.gap_keywords = config.gap_keywords.iter().map(|k| k.to_lowercase()).collect();
        config.clarity_keywords = config
            .clarity_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        Self { config }
    }

    pub fn classify(&self, quality_score: u8, feedback_text: &str) -> CategoryDecision {
        if quality_score >= self.config.advanced_min_score {
            return CategoryDecision {
                category: FollowupCategory::AdvancedApplication,
                matched_keyword: None,
                reason: format!("score {} is strong; push to application", quality_score),
            };
        }
        if quality_score <= self.config.clarification_max_score {
            return CategoryDecision {
                category: FollowupCategory::Clarification,
                matched_keyword: None,
                reason: format!("score {} is weak; ask for clarification", quality_score),
            };
        }

        let feedback_lower = feedback_text.to_lowercase();
        let find = |keywords: &[String]| {
            keywords
                .iter()
                .find(|k| feedback_lower.contains(k.as_str()))
                .cloned()
        };

        let decision = if let Some(keyword) = find(&self.config.gap_keywords) {
            CategoryDecision {
                category: FollowupCategory::GapFilling,
                reason: format!("feedback mentions '{}'", keyword),
                matched_keyword: Some(keyword),
            }
        } else if let Some(keyword) = find(&self.config.clarity_keywords) {
            CategoryDecision {
                category: FollowupCategory::Clarification,
                reason: format!("feedback mentions '{}'", keyword),
                matched_keyword: Some(keyword),
            }
        } else {
            CategoryDecision {
                category: FollowupCategory::GapFilling,
                matched_keyword: None,
                reason: "no feedback signal; defaulting to gap filling".to_string(),
            }
        };

        debug!(
            score = quality_score,
            category = %decision.category,
            keyword = ?decision.matched_keyword,
            "Classified follow-up category"
        );
        decision
    }
}

/// Classify with the default rule table.
pub fn classify_followup_type(quality_score: u8, feedback_text: &str) -> FollowupCategory {
    FollowupClassifier::new()
        .classify(quality_score, feedback_text)
        .category
}
