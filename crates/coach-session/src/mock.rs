//! Scripted collaborators for tests and offline practice.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::collaborators::{
    AnswerScorer, ClarificationProvider, ClarificationRequest, CollaboratorError,
    FeedbackProvider, FollowupGenerator, FollowupRequest,
};

/// How a scorer behaves once its script runs out.
#[derive(Debug, Clone, Copy)]
enum ScoreFallback {
    Fixed(u8),
    ByLength,
    Fail,
}

/// Scorer that replays a script of scores.
pub struct MockScorer {
    script: Mutex<VecDeque<u8>>,
    fallback: ScoreFallback,
}

impl MockScorer {
    /// Always returns `score`.
    pub fn fixed(score: u8) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScoreFallback::Fixed(score),
        }
    }

    /// Returns the scripted scores in order, then `then` forever.
    ///
    /// Scores are returned as-is, including out-of-range ones.
    pub fn scripted(scores: impl IntoIterator<Item = u8>, then: u8) -> Self {
        Self {
            script: Mutex::new(scores.into_iter().collect()),
            fallback: ScoreFallback::Fixed(then),
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScoreFallback::Fail,
        }
    }

    /// Scores by answer length in words. Deterministic, used offline.
    pub fn by_length() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScoreFallback::ByLength,
        }
    }
}

fn length_score(answer: &str) -> u8 {
    match answer.split_whitespace().count() {
        0..=7 => 1,
        8..=19 => 2,
        20..=39 => 3,
        40..=69 => 4,
        _ => 5,
    }
}

#[async_trait]
impl AnswerScorer for MockScorer {
    async fn score(&self, _question: &str, answer: &str) -> Result<u8, CollaboratorError> {
        let scripted = self
            .script
            .lock()
            .map_err(|e| CollaboratorError::Api(format!("scorer lock poisoned: {}", e)))?
            .pop_front();
        if let Some(score) = scripted {
            return Ok(score);
        }

        match self.fallback {
            ScoreFallback::Fixed(score) => Ok(score),
            ScoreFallback::ByLength => Ok(length_score(answer)),
            ScoreFallback::Fail => Err(CollaboratorError::Api("mock scorer failure".to_string())),
        }
    }
}

/// Feedback provider returning fixed text and recording iterations.
pub struct MockFeedback {
    script: Mutex<VecDeque<String>>,
    text: Option<String>,
    iterations: Mutex<Vec<u32>>,
}

impl MockFeedback {
    pub fn new() -> Self {
        Self::with_text("Reasonable start. Consider adding a concrete example.")
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            text: Some(text.into()),
            iterations: Mutex::new(Vec::new()),
        }
    }

    /// Returns the scripted texts in order, then `then` forever.
    pub fn scripted<I, S>(texts: I, then: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(texts.into_iter().map(Into::into).collect()),
            text: Some(then.into()),
            iterations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            text: None,
            iterations: Mutex::new(Vec::new()),
        }
    }

    /// Iteration numbers received so far, in call order.
    pub fn iterations(&self) -> Vec<u32> {
        self.iterations.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Default for MockFeedback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedbackProvider for MockFeedback {
    async fn feedback(
        &self,
        _question: &str,
        _answer: &str,
        iteration: u32,
    ) -> Result<String, CollaboratorError> {
        if let Ok(mut seen) = self.iterations.lock() {
            seen.push(iteration);
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match (scripted, &self.text) {
            (Some(text), _) => Ok(text),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(CollaboratorError::Api("mock feedback failure".to_string())),
        }
    }
}

#[derive(Debug, Clone)]
enum GeneratorMode {
    TopPattern,
    Fixed(String),
    Fail,
    Slow(Duration),
}

/// Follow-up generator that echoes the top retrieved pattern.
pub struct MockGenerator {
    mode: GeneratorMode,
    requests: Mutex<Vec<FollowupRequest>>,
}

impl MockGenerator {
    /// Echo the highest-ranked retrieved pattern.
    pub fn new() -> Self {
        Self::with_mode(GeneratorMode::TopPattern)
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_mode(GeneratorMode::Fixed(text.into()))
    }

    pub fn failing() -> Self {
        Self::with_mode(GeneratorMode::Fail)
    }

    /// Sleeps for `delay` before answering, for timeout tests.
    pub fn slow(delay: Duration) -> Self {
        Self::with_mode(GeneratorMode::Slow(delay))
    }

    fn with_mode(mode: GeneratorMode) -> Self {
        Self {
            mode,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<FollowupRequest> {
        self.requests.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FollowupGenerator for MockGenerator {
    async fn generate(&self, request: &FollowupRequest) -> Result<String, CollaboratorError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }

        match &self.mode {
            GeneratorMode::TopPattern => request
                .patterns
                .first()
                .map(|p| p.text.clone())
                .ok_or_else(|| CollaboratorError::Parse("no patterns to echo".to_string())),
            GeneratorMode::Fixed(text) => Ok(text.clone()),
            GeneratorMode::Fail => Err(CollaboratorError::Api("mock generator failure".to_string())),
            GeneratorMode::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("slow follow-up".to_string())
            }
        }
    }
}

/// Clarifier that answers from the concept context.
pub struct MockClarifier {
    fail: bool,
}

impl MockClarifier {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockClarifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClarificationProvider for MockClarifier {
    async fn clarify(&self, request: &ClarificationRequest) -> Result<String, CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Api("mock clarifier failure".to_string()));
        }
        Ok(format!(
            "About \"{}\": {}",
            request.student_question.trim(),
            request.context.trim()
        ))
    }
}
