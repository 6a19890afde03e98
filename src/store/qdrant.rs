//! Qdrant REST adapter for the vector store interface.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::QdrantConfig;

use super::{ChunkPoint, FieldFilter, Result, ScoredChunk, StoreError, VectorStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Vector store backed by a Qdrant collection over its REST API.
#[derive(Clone)]
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl QdrantStore {
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(StoreError::Config(
                "Qdrant URL must be an http(s) URL".to_string(),
            ));
        }
        if config.collection.trim().is_empty() {
            return Err(StoreError::Config(
                "missing Qdrant collection name".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = config.api_key.as_deref() {
            headers.insert(
                "api-key",
                HeaderValue::from_str(api_key.trim())
                    .map_err(|_| StoreError::Config("invalid Qdrant API key".to_string()))?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(StoreError::Service(format!("{status}: {body}")))
    }

    async fn collection_exists(&self) -> Result<bool> {
        let response = self.client.get(self.collection_url()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response).await?;
        Ok(true)
    }

    async fn create_collection(&self, dimension: usize) -> Result<()> {
        let body = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        let response = self
            .client
            .put(self.collection_url())
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        log::info!(
            "created Qdrant collection '{}' (dimension {dimension})",
            self.collection
        );
        Ok(())
    }
}

/// Qdrant filter clause for a single payload field match.
fn match_filter(filter: &FieldFilter) -> serde_json::Value {
    json!({
        "must": [
            { "key": filter.key, "match": { "value": filter.value } }
        ]
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize, recreate: bool) -> Result<()> {
        if recreate {
            let response = self.client.delete(self.collection_url()).send().await?;
            // A missing collection is fine when recreating from scratch.
            if response.status() != StatusCode::NOT_FOUND {
                Self::check(response).await?;
            }
            return self.create_collection(dimension).await;
        }

        if !self.collection_exists().await? {
            self.create_collection(dimension).await?;
        }
        Ok(())
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let body = json!({
            "points": points
                .iter()
                .map(|p| json!({
                    "id": p.id.to_string(),
                    "vector": p.vector,
                    "payload": p.payload,
                }))
                .collect::<Vec<_>>()
        });

        let url = format!("{}/points?wait=true", self.collection_url());
        let response = self.client.put(&url).json(&body).send().await?;
        Self::check(response).await?;
        log::debug!("upserted {count} points into '{}'", self.collection);
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filter {
            body["filter"] = match_filter(filter);
        }

        let url = format!("{}/points/search", self.collection_url());
        let response = self.client.post(&url).json(&body).send().await?;
        let parsed: SearchResponse = Self::check(response).await?.json().await?;

        parsed
            .result
            .into_iter()
            .map(|hit| {
                let payload = serde_json::from_value(hit.payload).map_err(|err| {
                    StoreError::InvalidResponse(format!("malformed point payload: {err}"))
                })?;
                Ok(ScoredChunk {
                    payload,
                    score: hit.score,
                })
            })
            .collect()
    }

    async fn delete(&self, filter: &FieldFilter) -> Result<()> {
        let body = json!({ "filter": match_filter(filter) });
        let url = format!("{}/points/delete?wait=true", self.collection_url());
        let response = self.client.post(&url).json(&body).send().await?;
        Self::check(response).await?;
        log::debug!("deleted points where {} = '{}'", filter.key, filter.value);
        Ok(())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    #[serde(default)]
    payload: serde_json::Value,
}
