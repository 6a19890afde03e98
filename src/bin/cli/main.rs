//! Command-line front end for corpus indexing and one-shot questions.
//!
//! The library owns the pipelines; this binary only wires configuration,
//! discovers chapter files and prints results.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use paideia::corpus::discover_chapters;
use paideia::llm::GeminiClient;
use paideia::rag::{AnswerRequest, Indexer, RagPipeline, SearchScope};
use paideia::store::QdrantStore;
use paideia::RagConfig;

#[derive(Parser)]
#[command(
    name = "paideia-cli",
    about = "Index textbook content and answer questions against it"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "paideia.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index all chapters under a docs directory
    Index {
        /// Directory holding the .mdx/.md chapter sources
        #[arg(long, default_value = "book/docs")]
        docs_dir: PathBuf,

        /// Delete and recreate the collection before indexing
        #[arg(long)]
        force_recreate: bool,
    },

    /// Ask a question against the indexed corpus
    Ask {
        question: String,

        /// Restrict retrieval to one chapter slug
        #[arg(long)]
        chapter: Option<String>,

        /// Number of context chunks to retrieve
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// Semantic search without generating an answer
    Search {
        query: String,

        /// Restrict the search to one module
        #[arg(long)]
        module: Option<String>,

        /// Maximum results
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = RagConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
    let store = Arc::new(QdrantStore::new(&config.qdrant)?);

    match cli.command {
        Command::Index {
            docs_dir,
            force_recreate,
        } => {
            let sources = discover_chapters(&docs_dir)?;
            if sources.is_empty() {
                anyhow::bail!("no chapter files found under {}", docs_dir.display());
            }
            println!("Found {} chapter files", sources.len());

            let indexer = Indexer::new(gemini.clone(), store, config.chunking.clone());
            let report = indexer.index_corpus(&sources, force_recreate).await?;

            println!(
                "Indexing complete: {} chapters indexed, {} skipped, {} failed",
                report.chapters_indexed, report.chapters_skipped, report.chapters_failed
            );
            println!("Total chunks indexed: {}", report.chunks_indexed);
        }

        Command::Ask {
            question,
            chapter,
            top_k,
        } => {
            let pipeline = RagPipeline::new(gemini.clone(), gemini.clone(), store);
            let mut request = AnswerRequest::new(question);
            request.scope = chapter.map(SearchScope::Chapter);
            request.top_k = top_k;

            let reply = pipeline.answer(&request).await;
            println!("{}\n", reply.answer);

            if !reply.sources.is_empty() {
                println!("Sources:");
                for source in &reply.sources {
                    println!(
                        "  {} ({}) score {:.3}",
                        source.chapter_slug, source.module_name, source.score
                    );
                }
            }
            if let Some(error) = reply.error {
                log::error!("pipeline reported: {error}");
            }
        }

        Command::Search {
            query,
            module,
            limit,
        } => {
            let pipeline = RagPipeline::new(gemini.clone(), gemini.clone(), store);
            let scope = module.map(SearchScope::Module);
            let hits = pipeline.search_corpus(&query, limit, scope.as_ref()).await;

            if hits.is_empty() {
                println!("No results found for '{query}'.");
                return Ok(());
            }
            for hit in hits {
                let snippet: String = hit.payload.content.chars().take(80).collect();
                println!(
                    "{:.3}  {}#{}  {}",
                    hit.score, hit.payload.chapter_slug, hit.payload.chunk_index, snippet
                );
            }
        }
    }

    Ok(())
}
