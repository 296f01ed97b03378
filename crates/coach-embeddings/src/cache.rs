//! On-disk store for the sentence-transformer files used by [`CandleEmbedder`].
//!
//! Files are fetched from the HuggingFace Hub on first use. Only missing
//! files are downloaded, so an interrupted download resumes where it
//! stopped.
//!
//! [`CandleEmbedder`]: crate::CandleEmbedder

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::EmbeddingError;

pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Files a BERT sentence-transformer needs.
pub const MODEL_FILES: [&str; 3] = [CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE];

/// Resolved locations of one model's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        }
    }
}

/// A model repo mirrored under a local cache root.
#[derive(Debug, Clone)]
pub struct ModelCache {
    pub root: PathBuf,
    pub repo_id: String,
}

impl Default for ModelCache {
    /// `<user cache dir>/interview-coach/models`, falling back to `./.cache`.
    fn default() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("interview-coach")
            .join("models");
        Self::new(root, DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            repo_id: repo_id.into(),
        }
    }

    /// "org/name" is stored as "org_name".
    pub fn model_dir(&self) -> PathBuf {
        self.root.join(self.repo_id.replace('/', "_"))
    }

    pub fn paths(&self) -> ModelPaths {
        ModelPaths::in_dir(&self.model_dir())
    }

    /// Files not yet on disk, in download order.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let dir = self.model_dir();
        MODEL_FILES
            .into_iter()
            .filter(|f| !dir.join(f).exists())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_files().is_empty()
    }

    /// Download whatever is missing and return the model paths.
    pub fn ensure(&self) -> Result<ModelPaths, EmbeddingError> {
        let missing = self.missing_files();
        if missing.is_empty() {
            debug!(dir = %self.model_dir().display(), "Embedding model cached");
            return Ok(self.paths());
        }

        info!(repo = %self.repo_id, files = ?missing, "Downloading embedding model");
        self.download(&missing)?;
        Ok(self.paths())
    }

    fn download(&self, files: &[&str]) -> Result<(), EmbeddingError> {
        let api = hf_hub::api::sync::Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
        let repo = api.model(self.repo_id.clone());
        let dir = self.model_dir();
        std::fs::create_dir_all(&dir)?;

        for file in files {
            let fetched = repo
                .get(file)
                .map_err(|e| EmbeddingError::Download(format!("{}: {}", file, e)))?;
            std::fs::copy(&fetched, dir.join(file))?;
            debug!(file, "Model file stored");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_root() {
        let cache = ModelCache::default();
        assert!(cache.root.ends_with("interview-coach/models"));
        assert_eq!(cache.repo_id, DEFAULT_MODEL_REPO);
    }

    #[test]
    fn test_missing_files_shrinks_as_files_appear() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "org/minilm");
        assert_eq!(cache.missing_files(), MODEL_FILES.to_vec());

        std::fs::create_dir_all(cache.model_dir()).unwrap();
        std::fs::write(cache.paths().config, "{}").unwrap();
        assert_eq!(cache.missing_files(), vec![TOKENIZER_FILE, WEIGHTS_FILE]);

        std::fs::write(cache.paths().tokenizer, "{}").unwrap();
        std::fs::write(cache.paths().weights, "").unwrap();
        assert!(cache.is_complete());
        assert!(cache.model_dir().ends_with("org_minilm"));
    }

    #[test]
    fn test_ensure_skips_download_when_complete() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "org/minilm");
        std::fs::create_dir_all(cache.model_dir()).unwrap();
        for file in MODEL_FILES {
            std::fs::write(cache.model_dir().join(file), "").unwrap();
        }
        assert_eq!(cache.ensure().unwrap(), cache.paths());
    }
}
