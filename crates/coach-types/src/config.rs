//! Configuration loading for the interview coach.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/interview-coach/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CoachError;

/// How the turn policy gates follow-ups behind revisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatingMode {
    /// A weak first answer must be revised before any follow-up, and only
    /// one follow-up may be pending per question.
    #[default]
    Strict,
    /// No revision requests; new attempts may supersede a pending follow-up.
    Permissive,
}

/// Which embedding backend builds corpus and query vectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Deterministic feature-hashing embedder (no model download)
    #[default]
    Hash,
    /// all-MiniLM-L6-v2 through Candle
    Candle,
}

/// Provider behind the scoring, feedback and generation calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Openai,
    Anthropic,
    /// Scripted collaborators, no network
    Offline,
}

/// LLM collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProvider,

    /// Model name (e.g., "gpt-4o-mini", "claude-3-haiku")
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_llm_model(),
            api_key: None,
            api_base_url: None,
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Follow-up pattern corpus (concept -> category -> patterns)
    #[serde(default = "default_patterns_path")]
    pub patterns_path: String,

    /// Question bank (list of category/question pairs)
    #[serde(default = "default_questions_path")]
    pub questions_path: String,

    /// Patterns retrieved per follow-up
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Score used when the scorer fails or answers out of range
    #[serde(default = "default_score")]
    pub default_score: u8,

    #[serde(default)]
    pub gating: GatingMode,

    #[serde(default)]
    pub embedder: EmbedderKind,

    /// Width of hash embeddings
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Upper bound on one follow-up generation call
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    #[serde(default)]
    pub llm: LlmSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_patterns_path() -> String {
    "data/followup_patterns.json".to_string()
}

fn default_questions_path() -> String {
    "data/questions.json".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_score() -> u8 {
    2
}

fn default_embedding_dim() -> usize {
    384
}

fn default_generation_timeout_ms() -> u64 {
    15_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            patterns_path: default_patterns_path(),
            questions_path: default_questions_path(),
            top_k: default_top_k(),
            default_score: default_score(),
            gating: GatingMode::default(),
            embedder: EmbedderKind::default(),
            embedding_dim: default_embedding_dim(),
            generation_timeout_ms: default_generation_timeout_ms(),
            llm: LlmSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/interview-coach/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (COACH_*, nested with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CoachError> {
        let config_dir = ProjectDirs::from("", "", "interview-coach")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| CoachError::Config(e.to_string()))?
            .set_default("patterns_path", default_patterns_path())
            .map_err(|e| CoachError::Config(e.to_string()))?
            .set_default("questions_path", default_questions_path())
            .map_err(|e| CoachError::Config(e.to_string()))?
            .set_default("top_k", default_top_k() as i64)
            .map_err(|e| CoachError::Config(e.to_string()))?
            .set_default("default_score", default_score() as i64)
            .map_err(|e| CoachError::Config(e.to_string()))?
            .set_default("llm.model", default_llm_model())
            .map_err(|e| CoachError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: COACH_TOP_K, COACH_LLM__API_KEY, COACH_LLM__PROVIDER, etc.
        builder = builder.add_source(
            Environment::with_prefix("COACH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CoachError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CoachError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), CoachError> {
        if self.top_k == 0 {
            return Err(CoachError::Config("top_k must be > 0".to_string()));
        }
        if !(1..=5).contains(&self.default_score) {
            return Err(CoachError::Config(format!(
                "default_score must be 1-5, got {}",
                self.default_score
            )));
        }
        if self.embedding_dim == 0 {
            return Err(CoachError::Config("embedding_dim must be > 0".to_string()));
        }
        if self.generation_timeout_ms == 0 {
            return Err(CoachError::Config(
                "generation_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.generation_timeout_ms)
    }
}
