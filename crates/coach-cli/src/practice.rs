//! Interactive practice loop.
//!
//! Reads one line at a time. Plain text is an answer (or a follow-up answer
//! while a follow-up is pending); lines starting with `:` are commands.

use std::io::Write;

use anyhow::Result;
use rand::Rng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use coach_session::{InterviewSession, SessionState, TurnAction, TurnOutcome};
use coach_types::{quality_label, Question};

use crate::questions::QuestionBank;

pub const HELP: &str = "Commands: :skip  :force  :clarify <question>  :next  :history  :reset  :help  :quit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Answer(String),
    Skip,
    Force,
    Clarify(String),
    Next,
    History,
    Reset,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(command) = line.strip_prefix(':') else {
            return ReplCommand::Answer(line.to_string());
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        match name {
            "skip" => ReplCommand::Skip,
            "force" => ReplCommand::Force,
            "clarify" => ReplCommand::Clarify(rest.to_string()),
            "next" => ReplCommand::Next,
            "history" => ReplCommand::History,
            "reset" => ReplCommand::Reset,
            "help" | "h" | "?" => ReplCommand::Help,
            "quit" | "q" | "exit" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

/// Drives an [`InterviewSession`] from line input.
pub struct PracticeLoop<'a, W: Write, R: Rng> {
    session: InterviewSession,
    bank: &'a QuestionBank,
    category: Option<String>,
    out: W,
    rng: R,
}

impl<'a, W: Write, R: Rng> PracticeLoop<'a, W, R> {
    pub fn new(
        session: InterviewSession,
        bank: &'a QuestionBank,
        category: Option<String>,
        out: W,
        rng: R,
    ) -> Self {
        Self {
            session,
            bank,
            category,
            out,
            rng,
        }
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until `:quit` or end of input.
    pub async fn run<I>(&mut self, input: I) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
    {
        writeln!(self.out, "Interview Coach: practice technical questions with feedback.")?;
        writeln!(self.out, "{}", HELP)?;
        if !self.next_question()? {
            return Ok(());
        }

        let mut lines = input.lines();
        self.prompt()?;
        while let Some(line) = lines.next_line().await? {
            if !self.handle(ReplCommand::parse(&line)).await? {
                break;
            }
            self.prompt()?;
        }
        Ok(())
    }

    /// Handle one command. Returns false to stop.
    pub async fn handle(&mut self, command: ReplCommand) -> Result<bool> {
        match command {
            ReplCommand::Quit => return Ok(false),
            ReplCommand::Empty => {}
            ReplCommand::Help => writeln!(self.out, "{}", HELP)?,
            ReplCommand::Unknown(name) => writeln!(self.out, "Unknown command :{}. {}", name, HELP)?,
            ReplCommand::Next => return self.next_question(),
            ReplCommand::Reset => {
                self.session.reset();
                writeln!(self.out, "Started a new interview session.")?;
                return self.next_question();
            }
            ReplCommand::History => self.print_history()?,
            ReplCommand::Skip => match self.session.skip_followup() {
                Ok(()) => writeln!(self.out, "Follow-up skipped. Type :next for another question.")?,
                Err(e) => writeln!(self.out, "! {}", e)?,
            },
            ReplCommand::Force => match self.session.force_followup().await {
                Ok(outcome) => self.print_followup(&outcome)?,
                Err(e) => writeln!(self.out, "! {}", e)?,
            },
            ReplCommand::Clarify(text) => match self.session.clarify(&text).await {
                Ok(reply) => writeln!(self.out, "\nClarification:\n{}\n", reply)?,
                Err(e) => writeln!(self.out, "! {}", e)?,
            },
            ReplCommand::Answer(text) => {
                if self.session.state() == SessionState::AwaitingFollowup {
                    self.answer_followup(&text).await?;
                } else {
                    self.answer(&text).await?;
                }
            }
        }
        Ok(true)
    }

    fn prompt(&mut self) -> Result<()> {
        let label = match self.session.state() {
            SessionState::AwaitingAnswer { revision: true } => "revised answer> ",
            SessionState::AwaitingFollowup => "follow-up answer> ",
            SessionState::Done => "answer again, or :next> ",
            _ => "answer> ",
        };
        write!(self.out, "{}", label)?;
        self.out.flush()?;
        Ok(())
    }

    fn next_question(&mut self) -> Result<bool> {
        let Some(question) = self
            .bank
            .pick(self.category.as_deref(), &mut self.rng)
            .cloned()
        else {
            writeln!(
                self.out,
                "No questions available{}.",
                self.category
                    .as_deref()
                    .map(|c| format!(" in category '{}'", c))
                    .unwrap_or_default()
            )?;
            return Ok(false);
        };
        self.print_question(&question)?;
        self.session.select_question(question);
        Ok(true)
    }

    fn print_question(&mut self, question: &Question) -> Result<()> {
        writeln!(self.out, "\nCategory: {}", question.display_category())?;
        writeln!(self.out, "Question: {}\n", question.question)?;
        Ok(())
    }

    async fn answer(&mut self, text: &str) -> Result<()> {
        let outcome = match self.session.submit_answer(text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                writeln!(self.out, "! {}", e)?;
                return Ok(());
            }
        };

        let score = outcome.attempt.quality_score;
        if !outcome.attempt.feedback_text.is_empty() {
            writeln!(self.out, "\nFeedback:\n{}", outcome.attempt.feedback_text)?;
        }
        writeln!(
            self.out,
            "\nAnswer Quality: {}/5 - {}",
            score,
            quality_label(score)
        )?;
        if let (true, Some(delta)) = (outcome.attempt.is_revision, outcome.improvement) {
            writeln!(self.out, "Improvement over your first answer: {:+}", delta)?;
        }

        match outcome.decision.action {
            TurnAction::RequestRevision => writeln!(
                self.out,
                "Suggestion: your answer could be stronger. Revise it using the feedback, or type :force to move to the follow-up anyway."
            )?,
            TurnAction::AskFollowup => self.print_followup(&outcome)?,
            TurnAction::None if score >= 5 => {
                writeln!(self.out, "Excellent answer! No follow-up needed. Type :next for another question.")?
            }
            TurnAction::None => writeln!(self.out, "Type :next for another question, or answer again.")?,
        }
        Ok(())
    }

    fn print_followup(&mut self, outcome: &TurnOutcome) -> Result<()> {
        if let Some(followup) = &outcome.followup {
            writeln!(self.out, "\nFollow-up Question:\n{}", followup)?;
            writeln!(self.out, "(answer it, or type :skip)")?;
        }
        Ok(())
    }

    async fn answer_followup(&mut self, text: &str) -> Result<()> {
        match self.session.answer_followup(text).await {
            Ok(outcome) => {
                if !outcome.feedback.is_empty() {
                    writeln!(self.out, "\nFollow-up Feedback:\n{}", outcome.feedback)?;
                }
                writeln!(self.out, "\nFollow-up Quality: {}/5", outcome.quality_score)?;
                writeln!(
                    self.out,
                    "Great job completing the full interview sequence! Type :next for another question."
                )?;
            }
            Err(e) => writeln!(self.out, "! {}", e)?,
        }
        Ok(())
    }

    fn print_history(&mut self) -> Result<()> {
        let mut records: Vec<(String, Vec<coach_types::Attempt>)> = self
            .session
            .history()
            .iter()
            .map(|r| (r.question.question.clone(), r.attempts.clone()))
            .collect();
        if let Some(question) = self.session.question() {
            if !self.session.thread().is_empty() {
                records.push((
                    question.question.clone(),
                    self.session.thread().attempts().to_vec(),
                ));
            }
        }

        if records.is_empty() {
            writeln!(self.out, "No answers yet.")?;
            return Ok(());
        }

        writeln!(self.out, "\nInterview History")?;
        for (i, (question, attempts)) in records.iter().enumerate() {
            writeln!(self.out, "Q{}: {}", i + 1, question)?;
            for attempt in attempts {
                writeln!(
                    self.out,
                    "  attempt {}: {}/5{}",
                    attempt.attempt_number,
                    attempt.quality_score,
                    if attempt.is_revision { " (Revised)" } else { "" }
                )?;
                if let Some(followup) = &attempt.followup_text {
                    writeln!(self.out, "    Follow-up: {}", followup)?;
                    match (attempt.followup_quality, attempt.followup_skipped) {
                        (Some(quality), _) => {
                            writeln!(self.out, "    Follow-up Quality: {}/5", quality)?
                        }
                        (None, true) => writeln!(self.out, "    (skipped)")?,
                        (None, false) => {}
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use coach_embeddings::{EmbeddingModel, HashEmbedder};
    use coach_retrieval::{ConceptIndex, FollowupRetriever, PatternCorpus};
    use coach_session::{
        Collaborators, MockClarifier, MockFeedback, MockGenerator, MockScorer, SessionConfig,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CORPUS: &str = r#"{
        "p_value": {
            "clarification": ["What exactly does a p-value of 0.03 tell you?"],
            "gap_filling": ["How does sample size change a p-value?"]
        }
    }"#;

    fn session(scores: Vec<u8>) -> InterviewSession {
        let model: Arc<dyn EmbeddingModel> = Arc::new(HashEmbedder::default());
        let corpus = PatternCorpus::from_json_str(CORPUS, model.as_ref()).unwrap();
        let retriever =
            FollowupRetriever::new(Arc::new(corpus), Arc::new(ConceptIndex::builtin()), model);
        InterviewSession::new(
            retriever,
            Collaborators::new(
                Arc::new(MockScorer::scripted(scores, 3)),
                Arc::new(MockFeedback::with_text("Decent, but unclear in places")),
                Arc::new(MockGenerator::new()),
                Arc::new(MockClarifier::new()),
            ),
            SessionConfig::default(),
        )
    }

    fn bank() -> QuestionBank {
        QuestionBank::new(vec![Question::new("statistics", "What is a p-value?")])
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse(":q"), ReplCommand::Quit);
        assert_eq!(
            ReplCommand::parse(":clarify   what is H0? "),
            ReplCommand::Clarify("what is H0?".to_string())
        );
        assert_eq!(
            ReplCommand::parse("It measures evidence"),
            ReplCommand::Answer("It measures evidence".to_string())
        );
        assert_eq!(ReplCommand::parse(":bogus"), ReplCommand::Unknown("bogus".to_string()));
    }

    #[tokio::test]
    async fn test_revision_then_followup_transcript() {
        let bank = bank();
        let mut repl = PracticeLoop::new(
            session(vec![1, 2, 4]),
            &bank,
            None,
            Vec::new(),
            StdRng::seed_from_u64(1),
        );
        let input: &[u8] = b"no idea\nthe probability of data this extreme\nit depends on n\n:history\n:quit\n";
        repl.run(input).await.unwrap();

        let output = String::from_utf8(repl.into_output()).unwrap();
        assert!(output.contains("Question: What is a p-value?"));
        assert!(output.contains("Answer Quality: 1/5 - Needs Work"));
        assert!(output.contains("Suggestion: your answer could be stronger"));
        assert!(output.contains("Answer Quality: 2/5 - Getting There"));
        assert!(output.contains("Improvement over your first answer: +1"));
        assert!(output.contains("Follow-up Question:\nWhat exactly does a p-value of 0.03 tell you?"));
        assert!(output.contains("Follow-up Quality: 4/5"));
        assert!(output.contains("attempt 2: 2/5 (Revised)"));
    }

    #[tokio::test]
    async fn test_skip_and_errors_are_reported() {
        let bank = bank();
        let mut repl = PracticeLoop::new(
            session(vec![3]),
            &bank,
            None,
            Vec::new(),
            StdRng::seed_from_u64(1),
        );
        let input: &[u8] = b":skip\n:clarify hi\nan answer\n:skip\n:force\n";
        repl.run(input).await.unwrap();

        let output = String::from_utf8(repl.into_output()).unwrap();
        assert!(output.contains("! No follow-up is pending"));
        assert!(output.contains("! Clarification question must be at least 5 characters"));
        assert!(output.contains("Follow-up skipped."));
        assert!(output.contains("! A follow-up was already asked for the latest answer"));
    }

    #[tokio::test]
    async fn test_unknown_category_stops() {
        let bank = bank();
        let mut repl = PracticeLoop::new(
            session(vec![]),
            &bank,
            Some("sql".to_string()),
            Vec::new(),
            StdRng::seed_from_u64(1),
        );
        repl.run(&b"answer\n"[..]).await.unwrap();
        let output = String::from_utf8(repl.into_output()).unwrap();
        assert!(output.contains("No questions available in category 'sql'."));
        assert!(!output.contains("Answer Quality"));
    }
}
