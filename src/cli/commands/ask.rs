//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    video: Option<&str>,
    min_similarity: Option<f32>,
    mut settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if min_similarity.is_some() {
        settings.retrieval.min_similarity = min_similarity;
    }
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching transcripts...");
    let result = orchestrator.ask(question, video).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            if !response.context_used {
                Output::warning(&response.retrieval.message());
            }

            println!("\n{}\n", response.answer);

            if !response.retrieval.ranked_chunks.is_empty() {
                Output::header("Sources");
                for (i, chunk) in response.retrieval.ranked_chunks.iter().enumerate() {
                    Output::ranked_chunk(
                        i + 1,
                        &chunk.video_id,
                        chunk.sequence_index,
                        chunk.similarity,
                        &chunk.text,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
