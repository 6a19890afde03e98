//! Google Gemini REST adapter for embeddings and chat completion.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;

use super::{AnswerGenerator, EmbeddingClient, LlmError, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Timeout generous enough that a slow completion is not cut off mid-answer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Generative Language API.
///
/// Implements both collaborator traits: `embedContent` for embeddings and
/// `generateContent` for answers. The client holds no mutable state and is
/// cheap to clone.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    embedding_model: String,
    chat_model: String,
    dimension: usize,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config(
                "missing Gemini API key (set GEMINI_API_KEY)".to_string(),
            ));
        }
        if config.embedding_model.trim().is_empty() || config.chat_model.trim().is_empty() {
            return Err(LlmError::Config("missing Gemini model name".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(config.api_key.trim())
                .map_err(|_| LlmError::Config("invalid Gemini API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            dimension: config.dimension,
        })
    }

    /// Point the client at a different API root. Used for self-hosted
    /// proxies and in tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
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
        Err(classify_failure(status, &body))
    }
}

/// Map an HTTP failure onto the error taxonomy: quota exhaustion and rate
/// limiting are distinct retryable variants, everything else is a service
/// error.
fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    if body.contains("RESOURCE_EXHAUSTED") {
        return LlmError::QuotaExceeded;
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimited;
    }
    LlmError::Service(format!("{status}: {body}"))
}

#[async_trait]
impl EmbeddingClient for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent",
            self.base_url, self.embedding_model
        );
        let request = EmbedRequest {
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        };

        let response = Self::check(self.client.post(&url).json(&request).send().await?).await?;
        let parsed: EmbedResponse = response.json().await?;

        let values = parsed.embedding.values;
        if values.len() != self.dimension {
            return Err(LlmError::InvalidResponse(format!(
                "embedding dimension {} does not match configured {}",
                values.len(),
                self.dimension
            )));
        }
        log::debug!("generated embedding of dimension {}", values.len());
        Ok(values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // One request per text: the API's rate ceiling is per request and
        // callers throttle between documents, not within them.
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        log::info!("generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl AnswerGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.chat_model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = Self::check(self.client.post(&url).json(&request).send().await?).await?;
        let parsed: GenerateResponse = response.json().await?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no candidates returned".to_string()))?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "candidate contained no text".to_string(),
            ));
        }
        log::info!("generated answer ({} chars)", text.len());
        Ok(text)
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    content: Content<'a>,
    #[serde(rename = "taskType")]
    task_type: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            ..GeminiConfig::default()
        }
    }

    #[test]
    fn test_new_rejects_missing_api_key() {
        let result = GeminiClient::new(&GeminiConfig::default());
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_classify_failure_variants() {
        let quota = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(quota, LlmError::QuotaExceeded));
        assert!(quota.is_retryable());

        let limited = classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(limited, LlmError::RateLimited));
        assert!(limited.is_retryable());

        let service = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(service, LlmError::Service(_)));
        assert!(!service.is_retryable());
    }

    #[test]
    fn test_dimension_comes_from_config() {
        let client = GeminiClient::new(&config()).unwrap();
        assert_eq!(client.dimension(), 768);
    }

    #[test]
    fn test_generate_response_parsing() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        let text: String = parsed.candidates[0]
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "Hello world");
    }
}
