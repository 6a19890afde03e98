//! In-memory vector store with brute-force cosine search.
//!
//! Used by tests and for store-less local runs. Brute force is fine at
//! this scale; anything bigger belongs in Qdrant.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChunkPoint, FieldFilter, Result, ScoredChunk, StoreError, VectorStore};

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    dimension: Option<usize>,
    points: Vec<ChunkPoint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored points.
    pub async fn len(&self) -> usize {
        self.state.read().await.points.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn matches_filter(point: &ChunkPoint, filter: &FieldFilter) -> bool {
    match filter.key {
        "chapter_slug" => point.payload.chapter_slug == filter.value,
        "module_name" => point.payload.module_name == filter.value,
        _ => false,
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, dimension: usize, recreate: bool) -> Result<()> {
        let mut state = self.state.write().await;
        if recreate {
            state.points.clear();
        }
        state.dimension = Some(dimension);
        Ok(())
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(expected) = state.dimension {
            for point in &points {
                if point.vector.len() != expected {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: point.vector.len(),
                    });
                }
            }
        }
        for point in points {
            // Same id overwrites, matching upsert semantics at the server.
            state.points.retain(|existing| existing.id != point.id);
            state.points.push(point);
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let state = self.state.read().await;

        let mut scored: Vec<ScoredChunk> = state
            .points
            .iter()
            .filter(|point| filter.map_or(true, |f| matches_filter(point, f)))
            .map(|point| ScoredChunk {
                payload: point.payload.clone(),
                score: cosine_similarity(vector, &point.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete(&self, filter: &FieldFilter) -> Result<()> {
        let mut state = self.state.write().await;
        state.points.retain(|point| !matches_filter(point, filter));
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::super::ChunkPayload;
    use super::*;

    fn payload(chapter: &str, module: &str, index: u32) -> ChunkPayload {
        ChunkPayload {
            chapter_slug: chapter.to_string(),
            module_name: module.to_string(),
            chunk_index: index,
            content: format!("{chapter} chunk {index}"),
            word_count: 3,
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = MemoryStore::new();
        store.ensure_collection(2, false).await.unwrap();
        store
            .upsert(vec![
                ChunkPoint::new(vec![1.0, 0.0], payload("a/one", "a", 0)),
                ChunkPoint::new(vec![0.0, 1.0], payload("a/two", "a", 0)),
                ChunkPoint::new(vec![0.7, 0.7], payload("a/three", "a", 0)),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload.chapter_slug, "a/one");
        assert_eq!(hits[1].payload.chapter_slug, "a/three");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_search_with_filters() {
        let store = MemoryStore::new();
        store.ensure_collection(2, false).await.unwrap();
        store
            .upsert(vec![
                ChunkPoint::new(vec![1.0, 0.0], payload("m1/intro", "m1", 0)),
                ChunkPoint::new(vec![1.0, 0.0], payload("m2/intro", "m2", 0)),
            ])
            .await
            .unwrap();

        let by_chapter = store
            .search(&[1.0, 0.0], 10, Some(&FieldFilter::chapter("m1/intro")))
            .await
            .unwrap();
        assert_eq!(by_chapter.len(), 1);
        assert_eq!(by_chapter[0].payload.chapter_slug, "m1/intro");

        let by_module = store
            .search(&[1.0, 0.0], 10, Some(&FieldFilter::module("m2")))
            .await
            .unwrap();
        assert_eq!(by_module.len(), 1);
        assert_eq!(by_module[0].payload.module_name, "m2");

        let no_match = store
            .search(&[1.0, 0.0], 10, Some(&FieldFilter::chapter("absent")))
            .await
            .unwrap();
        assert!(no_match.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let store = MemoryStore::new();
        store.ensure_collection(2, false).await.unwrap();

        store
            .upsert(vec![ChunkPoint::new(vec![1.0, 0.0], payload("c/x", "c", 0))])
            .await
            .unwrap();
        store
            .upsert(vec![ChunkPoint::new(vec![0.0, 1.0], payload("c/x", "c", 0))])
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        let hits = store.search(&[0.0, 1.0], 1, None).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_delete_by_filter() {
        let store = MemoryStore::new();
        store.ensure_collection(2, false).await.unwrap();
        store
            .upsert(vec![
                ChunkPoint::new(vec![1.0, 0.0], payload("keep/me", "k", 0)),
                ChunkPoint::new(vec![1.0, 0.0], payload("drop/me", "d", 0)),
                ChunkPoint::new(vec![0.0, 1.0], payload("drop/me", "d", 1)),
            ])
            .await
            .unwrap();

        store.delete(&FieldFilter::chapter("drop/me")).await.unwrap();
        assert_eq!(store.len().await, 1);
        let hits = store.search(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits[0].payload.chapter_slug, "keep/me");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = MemoryStore::new();
        store.ensure_collection(3, false).await.unwrap();
        let result = store
            .upsert(vec![ChunkPoint::new(vec![1.0, 0.0], payload("c/x", "c", 0))])
            .await;
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
