//! CLI argument parsing for the interview coach.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

use coach_types::FollowupCategory;

/// Interview Coach
///
/// Practice technical interview questions with scored feedback, revision
/// requests and retrieval-grounded follow-up questions.
#[derive(Parser, Debug)]
#[command(name = "interview-coach")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/interview-coach/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive practice session
    Practice {
        /// Only draw questions from this category
        #[arg(long)]
        category: Option<String>,

        /// Use local scripted collaborators instead of the LLM API
        #[arg(long)]
        offline: bool,

        /// Override the pattern corpus path
        #[arg(long)]
        patterns: Option<String>,

        /// Override the question bank path
        #[arg(long)]
        questions: Option<String>,
    },

    /// Rank follow-up patterns for a question and answer
    Retrieve {
        /// Original interview question
        question: String,

        /// Candidate answer
        answer: String,

        /// Desired follow-up category
        #[arg(long, default_value = "gap_filling")]
        category: FollowupCategory,

        /// Number of patterns to return (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Override the pattern corpus path
        #[arg(long)]
        patterns: Option<String>,
    },

    /// Classify the follow-up category for a score and feedback text
    Classify {
        /// Quality score (1-5)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        score: u8,

        /// Feedback text given on the answer
        feedback: String,
    },

    /// Show the turn decision for a score
    Decide {
        /// Quality score (1-5)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        score: u8,

        /// The answer was a requested revision
        #[arg(long)]
        revision: bool,

        /// Feedback text, used to classify a follow-up
        #[arg(long, default_value = "")]
        feedback: String,
    },

    /// List the built-in knowledge-base concepts
    Concepts,

    /// List questions in the question bank
    Questions {
        /// Only this category
        #[arg(long)]
        category: Option<String>,

        /// Override the question bank path
        #[arg(long)]
        path: Option<String>,
    },
}
