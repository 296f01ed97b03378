//! Interview Coach
//!
//! Conversational technical-interview practice: scored feedback, revision
//! requests and retrieval-grounded follow-up questions.
//!
//! # Usage
//!
//! ```bash
//! interview-coach practice [--category CATEGORY] [--offline]
//! interview-coach retrieve "What is a p-value?" "..." --category clarification
//! interview-coach classify 3 "You are missing an example"
//! interview-coach decide 2 --revision
//! interview-coach concepts
//! interview-coach questions [--category CATEGORY]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/interview-coach/config.toml)
//! 3. Environment variables (COACH_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use coach_cli::{
    init_logging, load_settings, run_classify, run_decide, run_practice, run_retrieve,
    show_concepts, show_questions, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Practice {
            category,
            offline,
            patterns,
            questions,
        } => {
            run_practice(
                &settings,
                category,
                offline,
                patterns.as_deref(),
                questions.as_deref(),
            )
            .await?;
        }
        Commands::Retrieve {
            question,
            answer,
            category,
            top_k,
            patterns,
        } => {
            run_retrieve(
                &settings,
                &question,
                &answer,
                category,
                top_k,
                patterns.as_deref(),
            )
            .await?;
        }
        Commands::Classify { score, feedback } => {
            run_classify(score, &feedback)?;
        }
        Commands::Decide {
            score,
            revision,
            feedback,
        } => {
            run_decide(&settings, score, revision, &feedback)?;
        }
        Commands::Concepts => {
            show_concepts()?;
        }
        Commands::Questions { category, path } => {
            show_questions(&settings, category.as_deref(), path.as_deref())?;
        }
    }

    Ok(())
}
