//! Interview questions.

use serde::{Deserialize, Serialize};

/// A question from the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Bank category (e.g. "statistics")
    pub category: String,

    /// Question text shown to the respondent
    pub question: String,
}

impl Question {
    pub fn new(category: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            question: question.into(),
        }
    }

    /// Category formatted for display ("machine_learning" -> "Machine Learning").
    pub fn display_category(&self) -> String {
        self.category
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Label shown next to a quality score.
pub fn quality_label(score: u8) -> &'static str {
    match score {
        1 => "Needs Work",
        2 => "Getting There",
        3 => "Good Start",
        4 => "Strong Answer",
        5 => "Excellent!",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_category() {
        let q = Question::new("machine_learning", "What is bagging?");
        assert_eq!(q.display_category(), "Machine Learning");
    }

    #[test]
    fn test_quality_label() {
        assert_eq!(quality_label(1), "Needs Work");
        assert_eq!(quality_label(5), "Excellent!");
        assert_eq!(quality_label(9), "Unknown");
    }
}
