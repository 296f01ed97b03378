//! Deterministic follow-up when generation fails.

use serde::{Deserialize, Serialize};

use coach_retrieval::ScoredPattern;

/// Asked when generation fails and retrieval found nothing.
pub const GENERIC_FOLLOWUP: &str = "Can you elaborate more on that concept?";

/// Where a follow-up's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupSource {
    /// Written by the generation collaborator
    Generated,
    /// Top retrieved corpus pattern
    Pattern,
    /// [`GENERIC_FOLLOWUP`]
    Generic,
}

/// Pick the top-ranked retrieved pattern, else the generic question.
pub fn fallback_followup(patterns: &[ScoredPattern]) -> (String, FollowupSource) {
    match patterns.first() {
        Some(top) => (top.pattern.text.clone(), FollowupSource::Pattern),
        None => (GENERIC_FOLLOWUP.to_string(), FollowupSource::Generic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_retrieval::FollowupPattern;

    fn scored(text: &str, index: usize, score: f32) -> ScoredPattern {
        ScoredPattern {
            pattern: FollowupPattern {
                concept_id: "general".to_string(),
                category: "gap_filling".to_string(),
                text: text.to_string(),
            },
            index,
            similarity: 0.0,
            score,
        }
    }

    #[test]
    fn test_top_pattern_wins() {
        let patterns = vec![scored("first?", 4, 0.9), scored("second?", 1, 0.8)];
        assert_eq!(
            fallback_followup(&patterns),
            ("first?".to_string(), FollowupSource::Pattern)
        );
    }

    #[test]
    fn test_generic_when_nothing_retrieved() {
        assert_eq!(
            fallback_followup(&[]),
            (GENERIC_FOLLOWUP.to_string(), FollowupSource::Generic)
        );
    }
}
