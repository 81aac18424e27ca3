//! One-shot CLI commands

use std::path::Path;

use tracing::info;

use lograg_core::{ChatResponse, Error, Result, RetrievalResult};
use lograg_rag::{DEFAULT_SYSTEM_INSTRUCTIONS, RetrievalPipeline, TextChunker};

use crate::ui::{print_chunks, print_matches, print_response};

/// Query asked when the user gives none
pub const DEMO_QUERY: &str = "Summarize the main topic of these logs.";

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub matches: Vec<RetrievalResult>,
    pub response: ChatResponse,
}

/// Retrieve the top `k` matches for `query`, print them, then print the model's answer.
///
/// Matches are printed before the chat backend is called, so they are shown
/// even when generation fails.
pub async fn run_query(
    pipeline: &RetrievalPipeline,
    query: &str,
    k: usize,
) -> Result<QueryOutcome> {
    info!(query, k, "running one-shot query");

    let (matches, context) = pipeline.retrieve(query, k).await?;
    print_matches(&matches);

    let response = pipeline
        .generate_response(context, query, DEFAULT_SYSTEM_INSTRUCTIONS)
        .await?;
    print_response(&response);

    Ok(QueryOutcome { matches, response })
}

/// Split a single file with `chunker` and print the chunk boundaries
pub async fn run_chunks(path: &Path, chunker: &TextChunker) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::DocumentLoader(format!("cannot read {}: {}", path.display(), e)))?;

    let chunks = chunker.split(&content);
    print_chunks(&path.display().to_string(), &chunks);
    Ok(chunks)
}
