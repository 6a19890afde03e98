//! The question-answering pipeline: embed, retrieve, assemble, generate.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::llm::{AnswerGenerator, EmbeddingClient, LlmError};
use crate::store::{ScoredChunk, StoreError, VectorStore};

use super::models::{AnswerReply, AnswerRequest, ChatTurn, SearchScope, SourceAttribution};
use super::retriever::Retriever;

/// Answer returned when retrieval finds nothing relevant. A designed
/// terminal state, not a failure.
const NO_CONTEXT_ANSWER: &str = "I couldn't find relevant information in the textbook to \
     answer your question. Could you try rephrasing or asking about a different topic?";

/// Answer returned when any pipeline step fails internally.
const ERROR_ANSWER: &str = "I encountered an error while processing your question. \
     Please try again or rephrase your question.";

const SYSTEM_INSTRUCTION: &str = "You are a helpful AI tutor for a technical textbook. \
     Your role is to explain concepts clearly, provide practical examples, \
     and help students understand the material. \
     Use the provided context from the textbook to answer questions accurately. \
     If you're not sure about something, say so.";

/// How many trailing conversation turns are included in the prompt.
const HISTORY_TURNS: usize = 5;

#[derive(Error, Debug)]
enum PipelineError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Answers student questions grounded in retrieved textbook chunks.
///
/// Holds read-only references to its collaborators and no other state,
/// so any number of questions can be in flight at once.
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    generator: Arc<dyn AnswerGenerator>,
    retriever: Retriever,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        generator: Arc<dyn AnswerGenerator>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedder,
            generator,
            retriever: Retriever::new(store),
        }
    }

    /// Answer a question with retrieved context.
    ///
    /// Never fails from the caller's perspective: an internal error
    /// produces the apology reply with the failure recorded in `error`.
    pub async fn answer(&self, request: &AnswerRequest) -> AnswerReply {
        log::info!(
            "answering question: {:.100}...",
            request.question
        );
        match self.try_answer(request).await {
            Ok(reply) => reply,
            Err(err) => {
                log::error!("RAG pipeline error: {err}");
                AnswerReply {
                    answer: ERROR_ANSWER.to_string(),
                    sources: Vec::new(),
                    context_chunks: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn try_answer(&self, request: &AnswerRequest) -> Result<AnswerReply, PipelineError> {
        let question_vector = self.embedder.embed(&request.question).await?;

        let hits = self
            .retriever
            .retrieve(&question_vector, request.top_k, request.scope.as_ref())
            .await?;

        if hits.is_empty() {
            log::warn!("no relevant context found");
            return Ok(AnswerReply {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                context_chunks: Vec::new(),
                error: None,
            });
        }

        let context_chunks: Vec<String> =
            hits.iter().map(|hit| hit.payload.content.clone()).collect();
        let sources = dedup_sources(&hits);
        log::info!(
            "retrieved {} chunks from {} sources",
            context_chunks.len(),
            sources.len()
        );

        let prompt = build_prompt(
            &request.question,
            &context_chunks,
            request.selected_text.as_deref(),
            &request.history,
        );
        let answer = self.generator.generate(&prompt).await?;

        Ok(AnswerReply {
            answer,
            sources,
            context_chunks,
            error: None,
        })
    }

    /// Find content similar to `text`, for "related topics" lookups.
    /// Failures degrade to an empty list.
    pub async fn similar_content(
        &self,
        text: &str,
        limit: usize,
        scope: Option<&SearchScope>,
    ) -> Vec<ScoredChunk> {
        match self.embed_and_retrieve(text, limit, scope).await {
            Ok(hits) => hits,
            Err(err) => {
                log::error!("similar-content lookup failed: {err}");
                Vec::new()
            }
        }
    }

    /// Semantic search over the corpus without generating an answer.
    /// Failures degrade to an empty list.
    pub async fn search_corpus(
        &self,
        query: &str,
        limit: usize,
        scope: Option<&SearchScope>,
    ) -> Vec<ScoredChunk> {
        match self.embed_and_retrieve(query, limit, scope).await {
            Ok(hits) => {
                log::info!("search found {} results", hits.len());
                hits
            }
            Err(err) => {
                log::error!("corpus search failed: {err}");
                Vec::new()
            }
        }
    }

    async fn embed_and_retrieve(
        &self,
        text: &str,
        limit: usize,
        scope: Option<&SearchScope>,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let vector = self.embedder.embed(text).await?;
        let hits = self.retriever.retrieve(&vector, limit, scope).await?;
        Ok(hits)
    }
}

/// Collapse hits into source attributions, deduplicated by
/// `(module, chapter)`. First-seen order is kept and the first
/// occurrence's score wins.
fn dedup_sources(hits: &[ScoredChunk]) -> Vec<SourceAttribution> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut sources = Vec::new();
    for hit in hits {
        let key = (
            hit.payload.module_name.as_str(),
            hit.payload.chapter_slug.as_str(),
        );
        if seen.insert(key) {
            sources.push(SourceAttribution {
                chapter_slug: hit.payload.chapter_slug.clone(),
                module_name: hit.payload.module_name.clone(),
                score: hit.score,
            });
        }
    }
    sources
}

/// Assemble the generation prompt. Part order is fixed: system
/// instruction, numbered context, selected text, trailing history,
/// question.
fn build_prompt(
    question: &str,
    context_chunks: &[String],
    selected_text: Option<&str>,
    history: &[ChatTurn],
) -> String {
    let context_text = context_chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Context {}]:\n{chunk}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut parts = vec![SYSTEM_INSTRUCTION.to_string()];

    if !context_text.is_empty() {
        parts.push(format!("\n\nRelevant textbook content:\n{context_text}"));
    }

    if let Some(selected) = selected_text {
        parts.push(format!(
            "\n\nUser selected this text for context:\n\"{selected}\""
        ));
    }

    if !history.is_empty() {
        let recent = &history[history.len().saturating_sub(HISTORY_TURNS)..];
        let history_text = recent
            .iter()
            .map(|turn| format!("{}: {}", capitalize(&turn.role), turn.content))
            .collect::<Vec<_>>()
            .join("\n");
        parts.push(format!("\n\nConversation history:\n{history_text}"));
    }

    parts.push(format!("\n\nStudent question: {question}"));

    parts.join("\n")
}

fn capitalize(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
