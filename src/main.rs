//! tuberag CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tuberag::cli::{commands, Cli, Commands};
use tuberag::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(|path| Settings::expand_path(path))
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = settings.log_level(cli.verbose);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("tuberag={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.transcript_cache_dir())?;

    // Execute command
    match &cli.command {
        Commands::Process { url } => {
            commands::run_process(url, settings).await?;
        }

        Commands::Ask {
            question,
            video,
            min_similarity,
        } => {
            commands::run_ask(question, video.as_deref(), *min_similarity, settings).await?;
        }

        Commands::Search {
            query,
            video,
            limit,
            min_similarity,
        } => {
            commands::run_search(query, video.as_deref(), *limit, *min_similarity, settings)
                .await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Stats => {
            commands::run_stats(settings).await?;
        }

        Commands::Delete { video_id, all } => {
            commands::run_delete(video_id.as_deref(), *all, settings).await?;
        }

        Commands::Summary { video_id } => {
            commands::run_summary(video_id, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &config_path, settings)?;
        }
    }

    Ok(())
}
