//! Stats command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the stats command.
pub async fn run_stats(settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Local) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = settings.vector_store.provider.to_string();
    let orchestrator = Orchestrator::new(settings)?;
    let stats = orchestrator.stats().await;

    Output::header("Index");
    Output::kv("Store", &store);
    Output::kv("Chunks", &stats.retrieval.index.total_chunks.to_string());
    Output::kv("Videos", &stats.retrieval.index.unique_video_count.to_string());

    Output::header("Models");
    Output::kv("Embedding", &stats.embedding_model);
    Output::kv(
        "Dimensions",
        &stats.retrieval.embedding_dimensions.to_string(),
    );
    Output::kv("Generation", &stats.generation_model);
    Output::kv("Top k", &stats.retrieval.top_k.to_string());

    Ok(())
}
