//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    video: Option<&str>,
    limit: Option<usize>,
    min_similarity: Option<f32>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator
        .search(query, video, limit, min_similarity)
        .await;
    spinner.finish_and_clear();

    match results {
        Ok(retrieval) if retrieval.has_context() => {
            Output::success(&format!("Found {} results", retrieval.ranked_chunks.len()));

            for (i, chunk) in retrieval.ranked_chunks.iter().enumerate() {
                Output::ranked_chunk(
                    i + 1,
                    &chunk.video_id,
                    chunk.sequence_index,
                    chunk.similarity,
                    &chunk.text,
                );
            }
        }
        Ok(retrieval) => {
            Output::warning(&retrieval.message());
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
