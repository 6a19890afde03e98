//! Retrieval-augmented question answering and corpus indexing.

mod indexer;
mod models;
mod pipeline;
mod retriever;

pub use indexer::{IndexError, Indexer};
pub use models::{
    AnswerReply, AnswerRequest, ChatTurn, IndexReport, SearchScope, SourceAttribution,
};
pub use pipeline::RagPipeline;
pub use retriever::Retriever;
