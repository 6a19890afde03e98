//! Vector store collaborator interface and the payload it persists.

mod memory;
mod qdrant;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vector store error: {0}")]
    Service(String),

    #[error("unexpected vector store response: {0}")]
    InvalidResponse(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid store configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Payload stored alongside each chunk vector.
///
/// Field names are the wire format: search filters address them by key,
/// so they stay snake_case and stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub chapter_slug: String,
    pub module_name: String,
    pub chunk_index: u32,
    pub content: String,
    pub word_count: usize,
    pub indexed_at: DateTime<Utc>,
}

/// A single equality condition on a payload field, the representation
/// store adapters translate into their own filter syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub key: &'static str,
    pub value: String,
}

impl FieldFilter {
    pub fn chapter(slug: &str) -> Self {
        Self {
            key: "chapter_slug",
            value: slug.to_string(),
        }
    }

    pub fn module(name: &str) -> Self {
        Self {
            key: "module_name",
            value: name.to_string(),
        }
    }
}

/// A point ready for upsert: deterministic id, vector and payload.
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    pub fn new(vector: Vec<f32>, payload: ChunkPayload) -> Self {
        let id = point_id(&payload.chapter_slug, payload.chunk_index);
        Self {
            id,
            vector,
            payload,
        }
    }
}

/// Deterministic point id for a `(chapter, chunk_index)` pair.
/// Re-upserting the same chunk overwrites the stored point instead of
/// duplicating it.
pub fn point_id(chapter_slug: &str, chunk_index: u32) -> Uuid {
    let name = format!("{chapter_slug}:{chunk_index}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// A search hit with its similarity score, best matches first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub payload: ChunkPayload,
    pub score: f32,
}

/// Persists `(vector, payload)` pairs and answers nearest-neighbor
/// queries, optionally narrowed by a payload field condition.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if needed; with `recreate`, drop and
    /// rebuild it empty.
    async fn ensure_collection(&self, dimension: usize, recreate: bool) -> Result<()>;

    /// Insert or overwrite points as one batch.
    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<()>;

    /// Nearest-neighbor search; an empty result is not an error.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Remove every point matching the filter.
    async fn delete(&self, filter: &FieldFilter) -> Result<()>;
}
