//! Session flow E2E tests for the interview coach.
//!
//! Drive an InterviewSession through realistic turns with scripted
//! collaborators: revision gating, follow-up retrieval and generation,
//! fallbacks, and question changes.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use coach_session::{
    Collaborators, FollowupSource, MockClarifier, MockFeedback, MockGenerator, MockScorer,
    SessionConfig, SessionError, SessionState, TurnAction, TurnDecision, GENERIC_FOLLOWUP,
};
use coach_types::{FollowupCategory, GatingMode, Question};
use e2e_tests::{p_value_question, scripted_collaborators, TestHarness, P_VALUE_CORPUS};

/// Score 1 earns a revision request; the revision scored 2 earns a
/// clarification follow-up grounded in the p_value patterns.
#[tokio::test]
async fn test_revision_then_clarification_followup() {
    let harness = TestHarness::new();
    let mut session = harness.session(
        P_VALUE_CORPUS,
        scripted_collaborators([1, 2], 3, "The explanation is vague."),
        SessionConfig::default(),
    );
    session.select_question(p_value_question());

    let first = session.submit_answer("Something about significance.").await.unwrap();
    assert_eq!(first.decision, TurnDecision::request_revision());
    assert!(first.followup.is_none());
    assert!(first.patterns.is_empty());
    assert_eq!(session.state(), SessionState::AwaitingAnswer { revision: true });
    assert!(!session.thread().has_pending_followup());

    let second = session
        .submit_answer("It measures how surprising the data is if the null hypothesis holds.")
        .await
        .unwrap();
    assert_eq!(
        second.decision,
        TurnDecision::ask_followup(FollowupCategory::Clarification)
    );
    assert!(second.attempt.is_revision);
    assert_eq!(second.improvement, Some(1));
    assert!(second.patterns.iter().all(|s| s.pattern.concept_id == "p_value"));
    assert_eq!(second.followup_source, Some(FollowupSource::Generated));
    assert_eq!(
        second.followup.as_deref(),
        Some(second.patterns[0].pattern.text.as_str())
    );
    assert_eq!(session.state(), SessionState::AwaitingFollowup);
    assert!(session.thread().has_pending_followup());

    let latest = session.thread().latest().unwrap();
    assert_eq!(latest.attempt_number, 2);
    assert_eq!(latest.followup_category, Some(FollowupCategory::Clarification));
}

#[tokio::test]
async fn test_followup_answer_completes_the_turn() {
    let harness = TestHarness::new();
    let mut session = harness.session(
        P_VALUE_CORPUS,
        scripted_collaborators([3, 4], 4, "Consider adding an example."),
        SessionConfig::default(),
    );
    session.select_question(p_value_question());

    let outcome = session
        .submit_answer("The probability of data at least this extreme under the null.")
        .await
        .unwrap();
    assert_eq!(
        outcome.decision,
        TurnDecision::ask_followup(FollowupCategory::GapFilling)
    );

    // Strict gating refuses a new attempt while the follow-up is pending.
    assert_eq!(
        session.submit_answer("another try").await.unwrap_err(),
        SessionError::FollowupPending
    );

    let answered = session
        .answer_followup("Larger samples shrink the p-value for the same effect.")
        .await
        .unwrap();
    assert_eq!(answered.quality_score, 4);
    assert!(!answered.score_defaulted);
    assert_eq!(session.state(), SessionState::Done);

    let latest = session.thread().latest().unwrap();
    assert_eq!(latest.followup_quality, Some(4));
    assert!(!latest.has_pending_followup());

    // Nothing left to attach to.
    assert_eq!(
        session.answer_followup("again").await.unwrap_err(),
        SessionError::NothingPending
    );
}

#[tokio::test]
async fn test_excellent_answer_ends_without_followup() {
    let harness = TestHarness::new();
    let mut session = harness.session(
        P_VALUE_CORPUS,
        scripted_collaborators([5], 5, "Excellent and complete."),
        SessionConfig::default(),
    );
    session.select_question(p_value_question());

    let outcome = session.submit_answer("A thorough answer.").await.unwrap();
    assert_eq!(outcome.decision.action, TurnAction::None);
    assert!(outcome.followup.is_none());
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(
        session.answer_followup("x").await.unwrap_err(),
        SessionError::NothingPending
    );
}

#[tokio::test]
async fn test_feedback_wording_steers_category() {
    let cases = [
        ("You are missing the role of alpha.", FollowupCategory::GapFilling),
        ("Please ADD an example.", FollowupCategory::GapFilling),
        ("The second half is unclear.", FollowupCategory::Clarification),
        ("A bit confusing overall.", FollowupCategory::Clarification),
        ("Solid.", FollowupCategory::GapFilling),
    ];

    for (feedback, expected) in cases {
        let harness = TestHarness::new();
        let mut session = harness.session(
            P_VALUE_CORPUS,
            scripted_collaborators([3], 3, feedback),
            SessionConfig::default(),
        );
        session.select_question(p_value_question());
        let outcome = session.submit_answer("A middling answer.").await.unwrap();
        assert_eq!(outcome.decision.category, Some(expected), "feedback: {}", feedback);
    }
}

/// Generation failure falls back to the top retrieved pattern.
#[tokio::test]
async fn test_generation_failure_uses_top_pattern() {
    let harness = TestHarness::new();
    let collaborators = Collaborators::new(
        Arc::new(MockScorer::fixed(4)),
        Arc::new(MockFeedback::new()),
        Arc::new(MockGenerator::failing()),
        Arc::new(MockClarifier::new()),
    );
    let mut session = harness.session(P_VALUE_CORPUS, collaborators, SessionConfig::default());
    session.select_question(p_value_question());

    let outcome = session.submit_answer("Evidence against the null.").await.unwrap();
    assert_eq!(outcome.followup_source, Some(FollowupSource::Pattern));
    assert_eq!(
        outcome.followup.as_deref(),
        Some(outcome.patterns[0].pattern.text.as_str())
    );
}

/// Timeout with an empty corpus falls all the way back to the generic question.
#[tokio::test]
async fn test_generation_timeout_with_empty_corpus_uses_generic() {
    let harness = TestHarness::new();
    let collaborators = Collaborators::new(
        Arc::new(MockScorer::fixed(3)),
        Arc::new(MockFeedback::new()),
        Arc::new(MockGenerator::slow(Duration::from_secs(5))),
        Arc::new(MockClarifier::new()),
    );
    let config = SessionConfig {
        generation_timeout: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let mut session = harness.session("{}", collaborators, config);
    session.select_question(p_value_question());

    let outcome = session.submit_answer("An answer.").await.unwrap();
    assert!(outcome.patterns.is_empty());
    assert_eq!(outcome.followup.as_deref(), Some(GENERIC_FOLLOWUP));
    assert_eq!(outcome.followup_source, Some(FollowupSource::Generic));
    assert!(session.thread().has_pending_followup());
}

#[tokio::test]
async fn test_scorer_failure_uses_default_score() {
    let harness = TestHarness::new();
    let collaborators = Collaborators::new(
        Arc::new(MockScorer::failing()),
        Arc::new(MockFeedback::new()),
        Arc::new(MockGenerator::new()),
        Arc::new(MockClarifier::new()),
    );
    let mut session = harness.session(P_VALUE_CORPUS, collaborators, SessionConfig::default());
    session.select_question(p_value_question());

    let outcome = session.submit_answer("Whatever.").await.unwrap();
    assert!(outcome.score_defaulted);
    assert_eq!(outcome.attempt.quality_score, 2);
    assert_eq!(outcome.decision, TurnDecision::request_revision());
}

#[tokio::test]
async fn test_permissive_mode_never_requests_revision() {
    let harness = TestHarness::new();
    let config = SessionConfig {
        gating: GatingMode::Permissive,
        ..SessionConfig::default()
    };
    let mut session = harness.session(
        P_VALUE_CORPUS,
        scripted_collaborators([1, 3, 4], 4, "Clear."),
        config,
    );
    session.select_question(p_value_question());

    let first = session.submit_answer("No idea.").await.unwrap();
    assert_eq!(first.decision.action, TurnAction::None);

    let second = session.submit_answer("A better answer.").await.unwrap();
    assert_eq!(second.decision.action, TurnAction::AskFollowup);
    assert!(session.thread().has_pending_followup());

    // A new attempt supersedes the pending follow-up.
    let third = session.submit_answer("An even better answer.").await.unwrap();
    assert_eq!(third.decision.action, TurnAction::AskFollowup);
    let attempts = session.thread().attempts();
    assert_eq!(attempts.len(), 3);
    assert!(attempts[1].followup_skipped);
    assert_eq!(third.improvement, Some(1));
}

#[tokio::test]
async fn test_changing_question_archives_thread() {
    let harness = TestHarness::new();
    let mut session = harness.session(
        P_VALUE_CORPUS,
        scripted_collaborators([3], 3, "Fine."),
        SessionConfig::default(),
    );
    session.select_question(p_value_question());
    session.submit_answer("First answer.").await.unwrap();
    session.skip_followup().unwrap();

    session.select_question(Question::new(
        "machine_learning",
        "Explain the bias-variance tradeoff.",
    ));
    assert!(session.thread().is_empty());
    assert_eq!(session.state(), SessionState::AwaitingAnswer { revision: false });
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].attempts.len(), 1);
    assert!(session.history()[0].attempts[0].followup_skipped);

    // Selecting again without answering archives nothing new.
    session.select_question(p_value_question());
    assert_eq!(session.history().len(), 1);

    session.reset();
    assert!(session.history().is_empty());
    assert_eq!(session.state(), SessionState::NoQuestion);
    assert_eq!(
        session.submit_answer("x").await.unwrap_err(),
        SessionError::NoQuestion
    );
}

#[tokio::test]
async fn test_force_followup_after_revision_request() {
    let harness = TestHarness::new();
    let mut session = harness.session(
        P_VALUE_CORPUS,
        scripted_collaborators([2], 2, "Unclear."),
        SessionConfig::default(),
    );
    session.select_question(p_value_question());

    let first = session.submit_answer("Short.").await.unwrap();
    assert_eq!(first.decision.action, TurnAction::RequestRevision);

    let forced = session.force_followup().await.unwrap();
    assert_eq!(
        forced.decision,
        TurnDecision::ask_followup(FollowupCategory::Clarification)
    );
    assert!(forced.followup.is_some());
    assert_eq!(
        session.force_followup().await.unwrap_err(),
        SessionError::FollowupPending
    );

    session.skip_followup().unwrap();
    assert_eq!(
        session.force_followup().await.unwrap_err(),
        SessionError::FollowupAlreadyAsked
    );
}

#[tokio::test]
async fn test_clarification_uses_concept_context() {
    let harness = TestHarness::new();
    let mut session = harness.session(
        P_VALUE_CORPUS,
        scripted_collaborators(Vec::<u8>::new(), 3, ""),
        SessionConfig::default(),
    );
    session.select_question(p_value_question());

    let reply = session.clarify("Do you want the formula?").await.unwrap();
    assert!(reply.contains("Do you want the formula?"));
    assert!(reply.contains("RELEVANT CONCEPT KNOWLEDGE"));

    assert_eq!(
        session.clarify("why").await.unwrap_err(),
        SessionError::InvalidClarification { min: 5 }
    );
}
