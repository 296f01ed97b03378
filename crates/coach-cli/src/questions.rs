//! Question bank loaded from `questions.json`.

use std::path::Path;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

use coach_types::{CoachError, Question};

/// All practice questions, in file order.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Load a JSON list of `{ "category": ..., "question": ... }`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoachError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoachError::NotFound(format!(
                "question bank {}",
                path.display()
            )));
        }

        let json = std::fs::read_to_string(path)?;
        let bank = Self::from_json_str(&json)?;
        info!(path = %path.display(), questions = bank.len(), "Loaded question bank");
        Ok(bank)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CoachError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.questions.iter().map(|q| q.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Question> + 'a {
        self.questions.iter().filter(move |q| q.category == category)
    }

    /// Uniform random question, within `category` when given.
    ///
    /// `None` for an unknown category or an empty bank.
    pub fn pick<'a, R: Rng + ?Sized>(&'a self, category: Option<&'a str>, rng: &mut R) -> Option<&'a Question> {
        let pool: Vec<&Question> = match category {
            Some(category) => self.in_category(category).collect(),
            None => self.questions.iter().collect(),
        };
        pool.choose(rng).copied()
    }
}
