//! Interview session state machine.
//!
//! One [`InterviewSession`] drives one respondent through questions. Every
//! turn is sequential: score, feedback, decision, then (maybe) retrieval and
//! generation, all completed before the next call is accepted. Collaborator
//! failures never surface as errors; they degrade to the configured default
//! score, empty feedback, or a fallback follow-up.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ulid::Ulid;

use coach_retrieval::{FollowupRetriever, ScoredPattern, DEFAULT_TOP_K};
use coach_types::{Attempt, FollowupCategory, GatingMode, Question, SessionThread, Settings};

use crate::collaborators::{
    AnswerScorer, ClarificationProvider, ClarificationRequest, FeedbackProvider,
    FollowupGenerator, FollowupRequest,
};
use crate::error::SessionError;
use crate::fallback::{fallback_followup, FollowupSource};
use crate::mock::{MockClarifier, MockFeedback, MockGenerator, MockScorer};
use crate::policy::{TurnAction, TurnDecision, TurnPolicy};

/// Shortest accepted clarification question, after trimming.
pub const CLARIFICATION_MIN_CHARS: usize = 5;

/// Shown when the clarification collaborator fails.
pub const CLARIFICATION_FALLBACK: &str =
    "Sorry, I couldn't answer that right now. Try rephrasing your question.";

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub gating: GatingMode,
    pub top_k: usize,

    /// Used when the scorer fails or returns a score outside 1..=5
    pub default_score: u8,

    /// Upper bound on one follow-up generation call
    pub generation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gating: GatingMode::Strict,
            top_k: DEFAULT_TOP_K,
            default_score: 2,
            generation_timeout: Duration::from_secs(15),
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            gating: settings.gating,
            top_k: settings.top_k,
            default_score: settings.default_score,
            generation_timeout: settings.generation_timeout(),
        }
    }
}

/// The external services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub scorer: Arc<dyn AnswerScorer>,
    pub feedback: Arc<dyn FeedbackProvider>,
    pub generator: Arc<dyn FollowupGenerator>,
    pub clarifier: Arc<dyn ClarificationProvider>,
}

impl Collaborators {
    pub fn new(
        scorer: Arc<dyn AnswerScorer>,
        feedback: Arc<dyn FeedbackProvider>,
        generator: Arc<dyn FollowupGenerator>,
        clarifier: Arc<dyn ClarificationProvider>,
    ) -> Self {
        Self {
            scorer,
            feedback,
            generator,
            clarifier,
        }
    }

    /// One service implementing all four roles.
    pub fn from_single<T>(service: Arc<T>) -> Self
    where
        T: AnswerScorer + FeedbackProvider + FollowupGenerator + ClarificationProvider + 'static,
    {
        Self {
            scorer: service.clone(),
            feedback: service.clone(),
            generator: service.clone(),
            clarifier: service,
        }
    }

    /// Deterministic local collaborators: length-based scoring, canned
    /// feedback, and the top retrieved pattern as the follow-up.
    pub fn offline() -> Self {
        Self {
            scorer: Arc::new(MockScorer::by_length()),
            feedback: Arc::new(MockFeedback::new()),
            generator: Arc::new(MockGenerator::new()),
            clarifier: Arc::new(MockClarifier::new()),
        }
    }
}

/// Where the session is within the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionState {
    NoQuestion,
    /// `revision` is true right after a revision request
    AwaitingAnswer { revision: bool },
    AwaitingFollowup,
    Done,
}

/// An archived question with its attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub question: Question,
    pub attempts: Vec<Attempt>,
    pub started_at: DateTime<Utc>,
}

/// Result of one scored answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The attempt as stored, including any follow-up
    pub attempt: Attempt,
    pub decision: TurnDecision,

    /// Retrieved patterns, empty unless a follow-up was asked
    pub patterns: Vec<ScoredPattern>,
    pub followup: Option<String>,
    pub followup_source: Option<FollowupSource>,

    /// Score change over the previous attempt on this question
    pub improvement: Option<i16>,

    /// The scorer failed or answered out of range
    pub score_defaulted: bool,
}

/// Result of answering a follow-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupOutcome {
    pub attempt: Attempt,
    pub quality_score: u8,

    /// Feedback on the follow-up answer, empty if the provider failed
    pub feedback: String,
    pub score_defaulted: bool,
}

/// Drives one respondent through questions, attempts and follow-ups.
pub struct InterviewSession {
    id: String,
    config: SessionConfig,
    policy: TurnPolicy,
    retriever: FollowupRetriever,
    collaborators: Collaborators,
    question: Option<Question>,
    question_started_at: DateTime<Utc>,
    thread: SessionThread,
    state: SessionState,
    history: Vec<QuestionRecord>,
}

impl InterviewSession {
    pub fn new(
        retriever: FollowupRetriever,
        collaborators: Collaborators,
        config: SessionConfig,
    ) -> Self {
        let id = Ulid::new().to_string();
        info!(session_id = %id, gating = ?config.gating, "Starting interview session");
        Self {
            id,
            policy: TurnPolicy::new(config.gating),
            config,
            retriever,
            collaborators,
            question: None,
            question_started_at: Utc::now(),
            thread: SessionThread::new(),
            state: SessionState::NoQuestion,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn policy(&self) -> &TurnPolicy {
        &self.policy
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn thread(&self) -> &SessionThread {
        &self.thread
    }

    /// Archived questions, oldest first.
    pub fn history(&self) -> &[QuestionRecord] {
        &self.history
    }

    /// Switch to a new question, archiving the current one.
    pub fn select_question(&mut self, question: Question) {
        self.archive_current();
        debug!(session_id = %self.id, category = %question.category, "Selected question");
        self.question = Some(question);
        self.question_started_at = Utc::now();
        self.state = SessionState::AwaitingAnswer { revision: false };
    }

    /// Score an answer to the current question and decide what comes next.
    pub async fn submit_answer(&mut self, answer: &str) -> Result<TurnOutcome, SessionError> {
        let question = self.current_question()?;
        if answer.trim().is_empty() {
            return Err(SessionError::BlankAnswer);
        }
        if self.thread.has_pending_followup() {
            if self.config.gating == GatingMode::Strict {
                return Err(SessionError::FollowupPending);
            }
            debug!(session_id = %self.id, "New attempt supersedes pending follow-up");
        }

        let is_revision = matches!(self.state, SessionState::AwaitingAnswer { revision: true });
        let (score, score_defaulted) = self.score(&question, answer).await;
        let iteration = self.thread.len() as u32 + 1;
        let feedback = self.fetch_feedback(&question, answer, iteration).await;

        self.thread
            .append(Attempt::new(answer, score, feedback.clone(), is_revision));
        let decision = self.policy.evaluate(score, &feedback, is_revision);

        info!(
            session_id = %self.id,
            attempt = iteration,
            score,
            is_revision,
            action = %decision.action,
            "Scored answer"
        );

        let mut outcome = TurnOutcome {
            attempt: self.latest_attempt()?,
            decision,
            patterns: Vec::new(),
            followup: None,
            followup_source: None,
            improvement: self.thread.improvement(),
            score_defaulted,
        };

        match (decision.action, decision.category) {
            (TurnAction::AskFollowup, Some(category)) => {
                self.fill_followup(&mut outcome, &question, category).await?;
            }
            (TurnAction::RequestRevision, _) => {
                self.state = SessionState::AwaitingAnswer { revision: true };
            }
            _ => {
                self.state = SessionState::Done;
            }
        }

        Ok(outcome)
    }

    /// Ask a follow-up for the latest attempt, bypassing the revision gate.
    pub async fn force_followup(&mut self) -> Result<TurnOutcome, SessionError> {
        let question = self.current_question()?;
        let latest = self.thread.latest().ok_or(SessionError::NoAttempt)?;
        if latest.has_pending_followup() {
            return Err(SessionError::FollowupPending);
        }
        if latest.followup_text.is_some() {
            return Err(SessionError::FollowupAlreadyAsked);
        }

        let category = self
            .policy
            .classify(latest.quality_score, &latest.feedback_text);
        let decision = TurnDecision::ask_followup(category);
        info!(session_id = %self.id, category = %category, "Forcing follow-up");

        let mut outcome = TurnOutcome {
            attempt: latest.clone(),
            decision,
            patterns: Vec::new(),
            followup: None,
            followup_source: None,
            improvement: self.thread.improvement(),
            score_defaulted: false,
        };
        self.fill_followup(&mut outcome, &question, category).await?;
        Ok(outcome)
    }

    /// Score and attach the answer to the pending follow-up.
    pub async fn answer_followup(&mut self, answer: &str) -> Result<FollowupOutcome, SessionError> {
        self.current_question()?;
        let followup_text = match self.thread.latest() {
            Some(latest) if latest.has_pending_followup() => {
                latest.followup_text.clone().unwrap_or_default()
            }
            _ => return Err(SessionError::NothingPending),
        };
        if answer.trim().is_empty() {
            return Err(SessionError::BlankAnswer);
        }

        let (score, score_defaulted) = self.score_text(&followup_text, answer).await;
        let feedback = self.feedback_text(&followup_text, answer, 1).await;
        let attempt = self
            .thread
            .attach_followup_answer(answer, score)
            .cloned()
            .ok_or(SessionError::NothingPending)?;
        self.state = SessionState::Done;

        info!(session_id = %self.id, score, "Follow-up answered");
        Ok(FollowupOutcome {
            attempt,
            quality_score: score,
            feedback,
            score_defaulted,
        })
    }

    /// Drop the pending follow-up.
    pub fn skip_followup(&mut self) -> Result<(), SessionError> {
        if !self.thread.skip_pending_followup() {
            return Err(SessionError::NothingPending);
        }
        self.state = SessionState::Done;
        debug!(session_id = %self.id, "Follow-up skipped");
        Ok(())
    }

    /// Answer a respondent's question about the current interview question.
    pub async fn clarify(&self, student_question: &str) -> Result<String, SessionError> {
        let question = self.current_question()?;
        if student_question.trim().chars().count() < CLARIFICATION_MIN_CHARS {
            return Err(SessionError::InvalidClarification {
                min: CLARIFICATION_MIN_CHARS,
            });
        }

        let request = ClarificationRequest {
            context: self.retriever.concepts().feedback_context(&question.question),
            question: question.question,
            answer: self
                .thread
                .latest()
                .map(|a| a.answer_text.clone())
                .unwrap_or_default(),
            student_question: student_question.trim().to_string(),
        };

        match self.collaborators.clarifier.clarify(&request).await {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => Ok(CLARIFICATION_FALLBACK.to_string()),
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Clarification failed");
                Ok(CLARIFICATION_FALLBACK.to_string())
            }
        }
    }

    /// Start over: no question, no thread, no history.
    pub fn reset(&mut self) {
        self.question = None;
        self.thread.reset();
        self.history.clear();
        self.state = SessionState::NoQuestion;
        info!(session_id = %self.id, "Session reset");
    }

    fn current_question(&self) -> Result<Question, SessionError> {
        self.question.clone().ok_or(SessionError::NoQuestion)
    }

    fn latest_attempt(&self) -> Result<Attempt, SessionError> {
        self.thread.latest().cloned().ok_or(SessionError::NoAttempt)
    }

    fn archive_current(&mut self) {
        let Some(question) = self.question.take() else {
            return;
        };
        if !self.thread.is_empty() {
            self.history.push(QuestionRecord {
                id: Ulid::new().to_string(),
                question,
                attempts: self.thread.attempts().to_vec(),
                started_at: self.question_started_at,
            });
        }
        self.thread.reset();
    }

    async fn score(&self, question: &Question, answer: &str) -> (u8, bool) {
        self.score_text(&question.question, answer).await
    }

    async fn score_text(&self, prompt: &str, answer: &str) -> (u8, bool) {
        match self.collaborators.scorer.score(prompt, answer).await {
            Ok(score) if (1..=5).contains(&score) => (score, false),
            Ok(score) => {
                warn!(
                    session_id = %self.id,
                    score,
                    default = self.config.default_score,
                    "Score out of range; using default"
                );
                (self.config.default_score, true)
            }
            Err(e) => {
                warn!(
                    session_id = %self.id,
                    error = %e,
                    default = self.config.default_score,
                    "Scoring failed; using default"
                );
                (self.config.default_score, true)
            }
        }
    }

    async fn fetch_feedback(&self, question: &Question, answer: &str, iteration: u32) -> String {
        self.feedback_text(&question.question, answer, iteration).await
    }

    async fn feedback_text(&self, prompt: &str, answer: &str, iteration: u32) -> String {
        match self
            .collaborators
            .feedback
            .feedback(prompt, answer, iteration)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Feedback failed; continuing without it");
                String::new()
            }
        }
    }

    /// Retrieve, generate and store a follow-up on the latest attempt.
    async fn fill_followup(
        &mut self,
        outcome: &mut TurnOutcome,
        question: &Question,
        category: FollowupCategory,
    ) -> Result<(), SessionError> {
        let latest = self.latest_attempt()?;
        let patterns = self
            .retrieve(&question.question, &latest.answer_text, category)
            .await;

        let concepts = self.retriever.concepts();
        let concept = concepts.resolve(&question.question);
        let request = FollowupRequest {
            question: question.question.clone(),
            answer: latest.answer_text.clone(),
            quality_score: latest.quality_score,
            feedback: latest.feedback_text.clone(),
            category,
            concept_id: concepts.concept_id_for(&question.question).to_string(),
            key_points: concept.map(|c| c.key_points.clone()).unwrap_or_default(),
            red_flags: concept.map(|c| c.red_flags.clone()).unwrap_or_default(),
            patterns: patterns.iter().map(|s| s.pattern.clone()).collect(),
        };

        let (text, source) = self.generate(&request, &patterns).await;
        self.thread.set_followup(text.clone(), category);
        self.state = SessionState::AwaitingFollowup;

        outcome.attempt = self.latest_attempt()?;
        outcome.patterns = patterns;
        outcome.followup = Some(text);
        outcome.followup_source = Some(source);
        Ok(())
    }

    /// Retrieval embeds the query, so it runs off the async executor.
    async fn retrieve(
        &self,
        question: &str,
        answer: &str,
        category: FollowupCategory,
    ) -> Vec<ScoredPattern> {
        let retriever = self.retriever.clone();
        let question = question.to_string();
        let answer = answer.to_string();
        let top_k = self.config.top_k;

        match tokio::task::spawn_blocking(move || {
            retriever.retrieve(&question, &answer, category, top_k)
        })
        .await
        {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Retrieval task failed");
                Vec::new()
            }
        }
    }

    async fn generate(
        &self,
        request: &FollowupRequest,
        patterns: &[ScoredPattern],
    ) -> (String, FollowupSource) {
        let call = self.collaborators.generator.generate(request);
        match tokio::time::timeout(self.config.generation_timeout, call).await {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                (text.trim().to_string(), FollowupSource::Generated)
            }
            Ok(Ok(_)) => {
                warn!(session_id = %self.id, "Generator returned empty text; using fallback");
                fallback_followup(patterns)
            }
            Ok(Err(e)) => {
                warn!(session_id = %self.id, error = %e, "Generation failed; using fallback");
                fallback_followup(patterns)
            }
            Err(_) => {
                warn!(
                    session_id = %self.id,
                    timeout_ms = self.config.generation_timeout.as_millis() as u64,
                    "Generation timed out; using fallback"
                );
                fallback_followup(patterns)
            }
        }
    }
}
