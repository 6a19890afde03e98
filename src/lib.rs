//! Retrieval-augmented question answering over a chunked textbook corpus.
//!
//! Two pipelines share one vector collection. Offline, chapter sources are
//! parsed, chunked, embedded and upserted by [`rag::Indexer`]. Online,
//! [`rag::RagPipeline`] embeds a student question, retrieves matching
//! chunks and asks a language model for an answer grounded in them.
//!
//! The external services sit behind narrow traits ([`llm::EmbeddingClient`],
//! [`llm::AnswerGenerator`], [`store::VectorStore`]); collaborator instances
//! are built once at startup and passed into the pipelines by reference.

pub mod config;
pub mod corpus;
pub mod llm;
pub mod rag;
pub mod store;

pub use config::RagConfig;
pub use rag::{AnswerReply, AnswerRequest, Indexer, RagPipeline};
