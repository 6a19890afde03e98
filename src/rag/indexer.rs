//! Offline corpus indexing: parse, chunk, embed, upsert.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::config::ChunkingConfig;
use crate::corpus::{chunk_chapter, parse_chapter, ChapterSource};
use crate::llm::{EmbeddingClient, LlmError};
use crate::store::{ChunkPayload, ChunkPoint, FieldFilter, StoreError, VectorStore};

use super::models::IndexReport;

/// Pause between chapters, keeping the run inside the embedding
/// service's request-rate ceiling.
const CHAPTER_THROTTLE: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),

    #[error("vector store write failed: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Builds the vector index the question pipeline reads.
///
/// Chapters are processed one at a time and embeddings one chunk at a
/// time; the embedding collaborator enforces a request-rate ceiling.
pub struct Indexer {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    chunking: ChunkingConfig,
    throttle: Duration,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            chunking,
            throttle: CHAPTER_THROTTLE,
        }
    }

    /// Replace the inter-chapter delay. Tests pass `Duration::ZERO`.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Index one chapter, returning the number of chunks written.
    ///
    /// Too-short content is skipped with a zero count. With
    /// `force_reindex`, existing chunks for the slug are deleted first;
    /// a deletion failure is logged and indexing proceeds, as
    /// deterministic point ids make duplicate upserts overwrite.
    /// An embedding or upsert failure aborts the chapter with the
    /// store's previous state for that slug intact.
    pub async fn index_chapter(
        &self,
        source: &ChapterSource,
        force_reindex: bool,
    ) -> Result<usize> {
        log::info!("processing chapter '{}'", source.slug);
        let parsed = parse_chapter(source);

        if parsed.is_too_short() {
            log::warn!("skipping '{}': content too short to index", parsed.slug);
            return Ok(0);
        }

        if force_reindex {
            if let Err(err) = self.store.delete(&FieldFilter::chapter(&parsed.slug)).await {
                log::warn!(
                    "could not delete existing chunks for '{}': {err}",
                    parsed.slug
                );
            }
        }

        let chunks = chunk_chapter(&parsed, &self.chunking);
        log::info!("created {} chunks for '{}'", chunks.len(), parsed.slug);
        if chunks.is_empty() {
            return Ok(0);
        }

        // One request per chunk, in order. All embeddings are gathered
        // before anything is written so a mid-batch failure leaves the
        // store untouched.
        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            vectors.push(self.embedder.embed(&chunk.text).await?);
        }

        let indexed_at = Utc::now();
        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                ChunkPoint::new(
                    vector,
                    ChunkPayload {
                        chapter_slug: chunk.chapter_slug,
                        module_name: chunk.module,
                        chunk_index: chunk.index,
                        content: chunk.text,
                        word_count: chunk.word_count,
                        indexed_at,
                    },
                )
            })
            .collect();

        let count = points.len();
        self.store.upsert(points).await?;
        log::info!("indexed {count} chunks for '{}'", source.slug);
        Ok(count)
    }

    /// Index a whole corpus, best-effort.
    ///
    /// The collection is created (or recreated) first; that failure is
    /// fatal. Per-chapter failures are logged and counted but never
    /// abort the run.
    pub async fn index_corpus(
        &self,
        sources: &[ChapterSource],
        force_recreate: bool,
    ) -> Result<IndexReport> {
        self.store
            .ensure_collection(self.embedder.dimension(), force_recreate)
            .await?;

        let mut report = IndexReport::default();
        for (position, source) in sources.iter().enumerate() {
            if position > 0 && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
            match self.index_chapter(source, force_recreate).await {
                Ok(0) => report.chapters_skipped += 1,
                Ok(count) => {
                    report.chapters_indexed += 1;
                    report.chunks_indexed += count;
                }
                Err(err) => {
                    log::error!("failed to index '{}': {err}", source.slug);
                    report.chapters_failed += 1;
                }
            }
        }

        log::info!(
            "indexing complete: {} chapters indexed, {} skipped, {} failed, {} chunks",
            report.chapters_indexed,
            report.chapters_skipped,
            report.chapters_failed,
            report.chunks_indexed
        );
        Ok(report)
    }
}
