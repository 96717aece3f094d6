//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Local) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let videos = orchestrator.list_videos().await;

    if videos.is_empty() {
        Output::info("No videos indexed yet.");
        Output::info("Use 'tuberag process <url>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Indexed Videos ({})", videos.len()));
    println!();

    for video in &videos {
        Output::video_info(&video.video_id, video.chunk_count);
    }

    let total_chunks: usize = videos.iter().map(|v| v.chunk_count).sum();
    println!();
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
