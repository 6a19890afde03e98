//! Runtime configuration for the indexing and question-answering pipelines.
//!
//! Settings load from a TOML file when one is present, with secrets and
//! endpoints overridable through environment variables so deployments can
//! keep keys out of the file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration shared by the CLI and both pipelines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub gemini: GeminiConfig,
    pub qdrant: QdrantConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

/// Gemini API settings for embeddings and chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; usually supplied via `GEMINI_API_KEY`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Vector dimension produced by the embedding model.
    pub dimension: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            embedding_model: "text-embedding-004".to_string(),
            chat_model: "gemini-2.5-flash".to_string(),
            dimension: 768,
        }
    }
}

/// Qdrant connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "textbook_content".to_string(),
        }
    }
}

/// Chunk sizing used when indexing chapter content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum words per chunk.
    pub max_words: usize,
    /// Words of overlap carried between windows of an oversized paragraph.
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: 500,
            overlap_words: 100,
        }
    }
}

/// Retrieval defaults for question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Context chunks retrieved per question.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

impl RagConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist. Environment variables override in either case.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                self.gemini.api_key = key;
            }
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            if !url.is_empty() {
                self.qdrant.url = url;
            }
        }
        if let Ok(key) = std::env::var("QDRANT_API_KEY") {
            if !key.is_empty() {
                self.qdrant.api_key = Some(key);
            }
        }
    }
}
