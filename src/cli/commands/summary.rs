//! Summary command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the summary command.
pub async fn run_summary(video_id: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Summarizing transcript...");
    let result = orchestrator.summarize(video_id).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            Output::header(&format!("Summary of {}", summary.video_id));
            println!("\n{}\n", summary.summary);
        }
        Err(e) => {
            Output::error(&format!("Failed to summarize video: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
