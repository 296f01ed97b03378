//! Interview coach CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations
//! - `practice`: Interactive practice loop
//! - `questions`: Question bank

pub mod cli;
pub mod commands;
pub mod practice;
pub mod questions;

pub use cli::{Cli, Commands};
pub use commands::{
    build_collaborators, build_embedder, build_retriever, init_logging, load_settings,
    run_classify, run_decide, run_practice, run_retrieve, show_concepts, show_questions,
};
pub use practice::{PracticeLoop, ReplCommand};
pub use questions::QuestionBank;
