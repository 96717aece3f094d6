//! Delete command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(video_id: Option<&str>, all: bool, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Local) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    if all {
        orchestrator.clear().await?;
        Output::success("Removed all indexed videos and cached transcripts.");
        return Ok(());
    }

    let Some(video_id) = video_id else {
        anyhow::bail!("a video id or --all is required");
    };

    if orchestrator.delete_video(video_id).await? {
        Output::success(&format!("Deleted video {}", video_id));
    } else {
        Output::warning(&format!("Video not found: {}", video_id));
    }

    Ok(())
}
