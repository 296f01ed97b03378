//! Command implementations for the interview coach.
//!
//! Handles:
//! - practice: Load config, corpus and questions, run the interactive loop
//! - retrieve / classify / decide: Inspect the retrieval and turn policy
//! - concepts / questions: List the knowledge base and question bank

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use coach_embeddings::{CandleEmbedder, EmbeddingModel, HashEmbedder};
use coach_llm::{ApiCoach, ApiCoachConfig};
use coach_retrieval::{ConceptIndex, FollowupRetriever, PatternCorpus};
use coach_session::{Collaborators, InterviewSession, SessionConfig, TurnPolicy};
use coach_types::{EmbedderKind, FollowupCategory, LlmProvider, Settings};

use crate::practice::PracticeLoop;
use crate::questions::QuestionBank;

/// Load settings and apply CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Build the embedding model named in the settings.
pub async fn build_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingModel>> {
    match settings.embedder {
        EmbedderKind::Hash => {
            let embedder = HashEmbedder::new(settings.embedding_dim)
                .context("Invalid hash embedder dimension")?;
            Ok(Arc::new(embedder))
        }
        EmbedderKind::Candle => {
            info!("Loading candle embedding model");
            let embedder = tokio::task::spawn_blocking(CandleEmbedder::load_default)
                .await
                .context("Embedding model loader panicked")?
                .context("Failed to load candle embedding model")?;
            Ok(Arc::new(embedder))
        }
    }
}

/// Load and embed the pattern corpus, then wrap it in a retriever.
pub async fn build_retriever(settings: &Settings, patterns_path: &str) -> Result<FollowupRetriever> {
    let model = build_embedder(settings).await?;
    let path = patterns_path.to_string();
    let corpus_model = model.clone();
    let corpus = tokio::task::spawn_blocking(move || {
        PatternCorpus::from_path(&path, corpus_model.as_ref())
    })
    .await
    .context("Corpus loader panicked")?
    .with_context(|| format!("Failed to load pattern corpus from {}", patterns_path))?;

    info!(
        patterns = corpus.len(),
        model = %model.info().name,
        "Pattern corpus ready"
    );
    Ok(FollowupRetriever::new(
        Arc::new(corpus),
        Arc::new(ConceptIndex::builtin()),
        model,
    ))
}

/// Pick the HTTP collaborators, or scripted ones when offline.
pub fn build_collaborators(settings: &Settings, offline: bool) -> Result<Collaborators> {
    if offline || settings.llm.provider == LlmProvider::Offline {
        info!("Using offline collaborators");
        return Ok(Collaborators::offline());
    }

    let mut llm = settings.llm.clone();
    if llm.api_key.is_none() {
        let fallback_var = match llm.provider {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            _ => "OPENAI_API_KEY",
        };
        llm.api_key = std::env::var(fallback_var).ok();
    }

    let config = ApiCoachConfig::from_settings(&llm)
        .context("LLM is not configured; set COACH_LLM__API_KEY or pass --offline")?;
    let coach = ApiCoach::new(config).context("Failed to build HTTP client")?;
    Ok(Collaborators::from_single(Arc::new(coach)))
}

/// Run the interactive practice loop on stdin/stdout.
pub async fn run_practice(
    settings: &Settings,
    category: Option<String>,
    offline: bool,
    patterns_path: Option<&str>,
    questions_path: Option<&str>,
) -> Result<()> {
    let questions_path = questions_path.unwrap_or(&settings.questions_path);
    let bank = QuestionBank::load(questions_path)
        .with_context(|| format!("Failed to load questions from {}", questions_path))?;

    if let Some(category) = &category {
        if !bank.categories().contains(&category.as_str()) {
            anyhow::bail!(
                "Unknown category '{}'. Available: {}",
                category,
                bank.categories().join(", ")
            );
        }
    }

    let retriever =
        build_retriever(settings, patterns_path.unwrap_or(&settings.patterns_path)).await?;
    if retriever.corpus().is_empty() {
        warn!("Pattern corpus is empty; follow-ups will use the generic fallback");
    }
    let collaborators = build_collaborators(settings, offline)?;
    let session = InterviewSession::new(retriever, collaborators, SessionConfig::from(settings));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut repl = PracticeLoop::new(session, &bank, category, std::io::stdout(), rand::rng());
    repl.run(stdin).await
}

/// Print ranked follow-up patterns for a question and answer.
pub async fn run_retrieve(
    settings: &Settings,
    question: &str,
    answer: &str,
    category: FollowupCategory,
    top_k: Option<usize>,
    patterns_path: Option<&str>,
) -> Result<()> {
    let retriever =
        build_retriever(settings, patterns_path.unwrap_or(&settings.patterns_path)).await?;
    let top_k = top_k.unwrap_or(settings.top_k);

    println!(
        "Concept: {}  Category: {}  Corpus: {} patterns",
        retriever.concepts().concept_id_for(question),
        category,
        retriever.corpus().len()
    );

    let results = retriever.retrieve(question, answer, category, top_k);
    if results.is_empty() {
        println!("No patterns retrieved.");
        return Ok(());
    }

    for (rank, scored) in results.iter().enumerate() {
        println!(
            "{:>2}. score={:.4} sim={:+.4} [{}/{}] {}",
            rank + 1,
            scored.score,
            scored.similarity,
            scored.pattern.concept_id,
            scored.pattern.category,
            scored.pattern.text
        );
    }
    Ok(())
}

pub fn run_classify(score: u8, feedback: &str) -> Result<()> {
    let decision = TurnPolicy::default().classifier().classify(score, feedback);
    println!("{}", decision.category);
    println!("  reason: {}", decision.reason);
    Ok(())
}

pub fn run_decide(settings: &Settings, score: u8, revision: bool, feedback: &str) -> Result<()> {
    let policy = TurnPolicy::new(settings.gating);
    let decision = policy.evaluate(score, feedback, revision);
    match decision.category {
        Some(category) => println!("{} ({})", decision.action, category),
        None => println!("{}", decision.action),
    }
    Ok(())
}

pub fn show_concepts() -> Result<()> {
    let index = ConceptIndex::builtin();
    println!("Keywords (first match wins):");
    for (keyword, id) in index.keywords() {
        println!("  {:<28} -> {}", keyword, id);
    }
    println!();
    for concept in index.concepts() {
        println!("{}", concept.id);
        println!("  {}", concept.definition);
        for point in &concept.key_points {
            println!("  - {}", point);
        }
    }
    Ok(())
}

pub fn show_questions(settings: &Settings, category: Option<&str>, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(&settings.questions_path);
    let bank = QuestionBank::load(Path::new(path))
        .with_context(|| format!("Failed to load questions from {}", path))?;

    for question in bank.questions() {
        if category.is_some_and(|c| c != question.category) {
            continue;
        }
        println!("[{}] {}", question.category, question.question);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_retriever_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(
            &path,
            r#"{"p_value": {"clarification": ["What does p = 0.03 mean?"]}}"#,
        )
        .unwrap();

        let settings = Settings::default();
        let retriever = build_retriever(&settings, path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(retriever.corpus().len(), 1);

        let results = retriever.retrieve(
            "What is a p-value?",
            "evidence",
            FollowupCategory::Clarification,
            3,
        );
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_corpus_is_empty() {
        let settings = Settings::default();
        let retriever = build_retriever(&settings, "/nonexistent/patterns.json")
            .await
            .unwrap();
        assert!(retriever.corpus().is_empty());
    }

    #[test]
    fn test_offline_collaborators_need_no_key() {
        let settings = Settings::default();
        assert!(build_collaborators(&settings, true).is_ok());

        let mut settings = Settings::default();
        settings.llm.provider = LlmProvider::Offline;
        assert!(build_collaborators(&settings, false).is_ok());
    }

    #[test]
    fn test_api_collaborators_with_key() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("sk-test".to_string());
        assert!(build_collaborators(&settings, false).is_ok());
    }
}
