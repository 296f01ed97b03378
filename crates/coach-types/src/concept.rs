//! Concept records and follow-up categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Concept id used when a question matches no known concept.
pub const GENERAL_CONCEPT: &str = "general";

/// A named knowledge unit the interview questions are built around.
///
/// Records are created once from a fixed table and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRecord {
    /// Stable key (e.g. "p_value")
    pub id: String,

    /// One-paragraph definition
    pub definition: String,

    /// Points a complete answer should cover, in priority order
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Common interview mistakes for this concept
    #[serde(default)]
    pub red_flags: Vec<String>,

    /// How the concept is applied in practice, when the table has it
    #[serde(default)]
    pub practical_application: Option<String>,
}

impl ConceptRecord {
    /// Create a record with no optional fields.
    pub fn new(id: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            definition: definition.into(),
            key_points: Vec::new(),
            red_flags: Vec::new(),
            practical_application: None,
        }
    }

    pub fn with_key_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_points = points.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_red_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.red_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_practical_application(mut self, text: impl Into<String>) -> Self {
        self.practical_application = Some(text.into());
        self
    }
}

/// Intent of a follow-up question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupCategory {
    /// Re-explain or correct a shaky part of the answer
    Clarification,
    /// Cover something the answer left out
    GapFilling,
    /// Apply the concept to a harder or practical scenario
    AdvancedApplication,
}

impl FollowupCategory {
    pub const ALL: [FollowupCategory; 3] = [
        FollowupCategory::Clarification,
        FollowupCategory::GapFilling,
        FollowupCategory::AdvancedApplication,
    ];

    /// Returns the corpus key for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowupCategory::Clarification => "clarification",
            FollowupCategory::GapFilling => "gap_filling",
            FollowupCategory::AdvancedApplication => "advanced_application",
        }
    }
}

impl fmt::Display for FollowupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FollowupCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clarification" => Ok(FollowupCategory::Clarification),
            "gap_filling" => Ok(FollowupCategory::GapFilling),
            "advanced_application" => Ok(FollowupCategory::AdvancedApplication),
            other => Err(format!("unknown follow-up category: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in FollowupCategory::ALL {
            assert_eq!(category.as_str().parse::<FollowupCategory>(), Ok(category));
        }
        assert!("advanced".parse::<FollowupCategory>().is_err());
    }

    #[test]
    fn test_category_serde_uses_corpus_keys() {
        let json = serde_json::to_string(&FollowupCategory::GapFilling).unwrap();
        assert_eq!(json, "\"gap_filling\"");
    }

    #[test]
    fn test_concept_builder() {
        let record = ConceptRecord::new("p_value", "Probability of data this extreme")
            .with_key_points(["Not P(H0)"])
            .with_red_flags(["Calling it P(H0 is true)"]);
        assert_eq!(record.key_points.len(), 1);
        assert_eq!(record.red_flags.len(), 1);
        assert!(record.practical_application.is_none());
    }
}
