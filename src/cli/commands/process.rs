//! Process command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the process command.
pub async fn run_process(url: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Process) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Fetching and indexing transcript...");
    let result = orchestrator.process_video(url).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) if result.skipped => {
            Output::info(&format!("{}: {}", result.message, result.video_id));
        }
        Ok(result) => {
            Output::success(&result.message);
            Output::kv("Video", &result.video_id);
            Output::kv("URL", &result.url.clean_url);
            if let Some(stats) = result.stats {
                Output::kv("Chunks", &stats.total_chunks.to_string());
                Output::kv("Segments", &stats.total_segments.to_string());
                Output::kv("Characters", &stats.transcript_length.to_string());
            }
            if let Some(lengths) = result.chunk_stats {
                Output::kv(
                    "Chunk length",
                    &format!(
                        "avg {:.0}, min {}, max {}",
                        lengths.avg_length, lengths.min_length, lengths.max_length
                    ),
                );
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to process video: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
