//! Context retrieval over the vector store.

use std::sync::Arc;

use crate::store::{self, FieldFilter, ScoredChunk, VectorStore};

use super::models::SearchScope;

/// Ranked-candidate lookup for a query vector.
///
/// Ranking is entirely the store's job; the retriever only translates a
/// [`SearchScope`] into the store's filter representation. No matches is
/// an empty result, not an error.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub async fn retrieve(
        &self,
        query_vector: &[f32],
        limit: usize,
        scope: Option<&SearchScope>,
    ) -> store::Result<Vec<ScoredChunk>> {
        let filter = scope.map(scope_filter);
        self.store.search(query_vector, limit, filter.as_ref()).await
    }
}

fn scope_filter(scope: &SearchScope) -> FieldFilter {
    match scope {
        SearchScope::Chapter(slug) => FieldFilter::chapter(slug),
        SearchScope::Module(name) => FieldFilter::module(name),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::store::{ChunkPayload, ChunkPoint, MemoryStore};

    use super::*;

    fn point(chapter: &str, module: &str, vector: Vec<f32>) -> ChunkPoint {
        ChunkPoint::new(
            vector,
            ChunkPayload {
                chapter_slug: chapter.to_string(),
                module_name: module.to_string(),
                chunk_index: 0,
                content: format!("{chapter} content"),
                word_count: 2,
                indexed_at: Utc::now(),
            },
        )
    }

    #[test]
    fn test_scope_translation() {
        assert_eq!(
            scope_filter(&SearchScope::Chapter("m1/intro".to_string())),
            FieldFilter::chapter("m1/intro")
        );
        assert_eq!(
            scope_filter(&SearchScope::Module("m1".to_string())),
            FieldFilter::module("m1")
        );
    }

    #[tokio::test]
    async fn test_retrieve_scoped_and_empty() {
        let store = Arc::new(MemoryStore::new());
        store.ensure_collection(2, false).await.unwrap();
        store
            .upsert(vec![
                point("m1/intro", "m1", vec![1.0, 0.0]),
                point("m2/intro", "m2", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let retriever = Retriever::new(store);

        let scoped = retriever
            .retrieve(
                &[1.0, 0.0],
                5,
                Some(&SearchScope::Module("m2".to_string())),
            )
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].payload.module_name, "m2");

        let none = retriever
            .retrieve(
                &[1.0, 0.0],
                5,
                Some(&SearchScope::Chapter("missing".to_string())),
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
