//! Integration tests for the interview coach CLI.
//!
//! These tests run the practice loop end to end over the shipped data
//! files with offline collaborators.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

use coach_cli::{build_collaborators, build_retriever, PracticeLoop, QuestionBank};
use coach_session::{InterviewSession, SessionConfig};
use coach_types::Settings;

fn data_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data")
        .join(name)
}

fn shipped_settings() -> Settings {
    let mut settings = Settings::default();
    settings.patterns_path = data_file("followup_patterns.json")
        .to_string_lossy()
        .into_owned();
    settings.questions_path = data_file("questions.json").to_string_lossy().into_owned();
    settings
}

async fn offline_session(settings: &Settings) -> InterviewSession {
    let retriever = build_retriever(settings, &settings.patterns_path)
        .await
        .expect("Failed to build retriever");
    assert!(!retriever.corpus().is_empty());
    let collaborators = build_collaborators(settings, true).expect("Offline collaborators");
    InterviewSession::new(retriever, collaborators, SessionConfig::from(settings))
}

/// Offline scoring is by answer length: a short answer earns a revision
/// request, a 30-word revision earns a follow-up, and a 49-word follow-up
/// answer scores 4.
#[tokio::test]
async fn test_offline_practice_transcript() {
    let settings = shipped_settings();
    let bank = QuestionBank::load(&settings.questions_path).unwrap();
    let session = offline_session(&settings).await;

    let mut repl = PracticeLoop::new(
        session,
        &bank,
        Some("statistics".to_string()),
        Vec::new(),
        StdRng::seed_from_u64(11),
    );

    let transcript = "\
no idea
A p-value is the probability of seeing data at least as extreme as what we observed, assuming the null hypothesis is true, so small values suggest the null is unlikely.
A p-value is the probability of seeing data at least as extreme as what we observed, assuming the null hypothesis is true, so small values suggest the null is unlikely. It does not tell us the probability that the hypothesis is true, and it depends heavily on sample size.
:history
:quit
";
    repl.run(transcript.as_bytes()).await.unwrap();

    let output = String::from_utf8(repl.into_output()).unwrap();
    assert!(output.contains("Category: Statistics"), "{}", output);
    assert!(output.contains("Answer Quality: 1/5"));
    assert!(output.contains("Suggestion: your answer could be stronger"));
    assert!(output.contains("Answer Quality: 3/5"));
    assert!(output.contains("Improvement over your first answer: +2"));
    assert!(output.contains("Follow-up Question:"));
    assert!(output.contains("Follow-up Quality: 4/5"));
    assert!(output.contains("attempt 2: 3/5 (Revised)"));
}

#[tokio::test]
async fn test_next_archives_and_reset_clears() {
    let settings = shipped_settings();
    let bank = QuestionBank::load(&settings.questions_path).unwrap();
    let session = offline_session(&settings).await;

    let mut repl = PracticeLoop::new(session, &bank, None, Vec::new(), StdRng::seed_from_u64(3));
    let transcript = "no idea\n:next\n:history\n:reset\n:history\n:quit\n";
    repl.run(transcript.as_bytes()).await.unwrap();

    let output = String::from_utf8(repl.into_output()).unwrap();
    assert!(output.contains("Interview History"));
    assert!(output.contains("attempt 1: 1/5"));
    assert!(output.contains("Started a new interview session."));
    assert!(output.contains("No answers yet."));
}

#[test]
fn test_shipped_question_categories() {
    let bank = QuestionBank::load(data_file("questions.json")).unwrap();
    let categories = bank.categories();
    assert!(categories.contains(&"statistics"));
    assert!(categories.contains(&"machine_learning"));
}
