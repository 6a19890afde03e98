//! Language-model collaborator interfaces: embeddings and answer generation.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("model service rate limit hit")]
    RateLimited,

    #[error("model service quota exhausted")]
    QuotaExceeded,

    #[error("model service error: {0}")]
    Service(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected model service response: {0}")]
    InvalidResponse(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// True for failures the caller may retry after backing off.
    /// Retrying itself is the caller's business, not this crate's.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited | LlmError::QuotaExceeded)
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Maps text to a fixed-dimension embedding vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimension of the vectors this client produces.
    fn dimension(&self) -> usize;
}

/// Maps an assembled prompt to generated answer text.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
