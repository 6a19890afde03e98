//! Request and response records for the question-answering pipeline.

use serde::{Deserialize, Serialize};

/// Default number of context chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Optional constraint narrowing retrieval to part of the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Restrict to one chapter by slug.
    Chapter(String),
    /// Restrict to one module by name.
    Module(String),
}

/// One prior turn of a tutoring conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Speaker role, e.g. "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A student question with its optional context.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub question: String,
    /// Text the student selected in the book, passed through as extra
    /// context for the model.
    pub selected_text: Option<String>,
    pub scope: Option<SearchScope>,
    /// Previous conversation turns, oldest first.
    pub history: Vec<ChatTurn>,
    /// Number of context chunks to retrieve.
    pub top_k: usize,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            selected_text: None,
            scope: None,
            history: Vec::new(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Where an answer's supporting context came from.
///
/// Deduplicated by `(module, chapter)` within one reply; the first
/// occurrence keeps its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttribution {
    pub chapter_slug: String,
    pub module_name: String,
    pub score: f32,
}

/// The reply handed back to the caller.
///
/// This is always a well-formed answer: retrieval misses and internal
/// failures surface as fixed fallback text, with `error` carrying the
/// failure description for logging in the latter case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReply {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
    /// The retrieved chunk texts the answer was grounded on.
    pub context_chunks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one corpus indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub chapters_indexed: usize,
    pub chapters_skipped: usize,
    pub chapters_failed: usize,
    pub chunks_indexed: usize,
}
