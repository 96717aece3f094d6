//! CLI module for tuberag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// tuberag - question answering over YouTube transcripts
///
/// Fetches video transcripts, indexes them as embedded chunks, and answers
/// questions grounded in the indexed content.
#[derive(Parser, Debug)]
#[command(name = "tuberag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TUBERAG_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, chunk, embed and index a video transcript
    Process {
        /// YouTube URL or bare video id
        url: String,
    },

    /// Ask a question answered from indexed transcripts
    Ask {
        /// The question to ask
        question: String,

        /// Restrict retrieval to one video id
        #[arg(long)]
        video: Option<String>,

        /// Only use chunks at or above this similarity (0.0-1.0)
        #[arg(short, long)]
        min_similarity: Option<f32>,
    },

    /// Search indexed transcripts without generating an answer
    Search {
        /// Search query
        query: String,

        /// Restrict the search to one video id
        #[arg(long)]
        video: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long)]
        min_similarity: Option<f32>,
    },

    /// List indexed videos
    List,

    /// Show index and model statistics
    Stats,

    /// Remove a video (or everything) from the index and transcript cache
    Delete {
        /// Video id to delete
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        video_id: Option<String>,

        /// Delete every indexed video
        #[arg(long)]
        all: bool,
    },

    /// Summarize an indexed video
    Summary {
        /// Video id to summarize
        video_id: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file if none exists
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_filters() {
        let cli = Cli::parse_from([
            "tuberag",
            "ask",
            "what is ownership",
            "--video",
            "dQw4w9WgXcQ",
            "--min-similarity",
            "0.4",
        ]);

        match cli.command {
            Commands::Ask {
                question,
                video,
                min_similarity,
            } => {
                assert_eq!(question, "what is ownership");
                assert_eq!(video.as_deref(), Some("dQw4w9WgXcQ"));
                assert_eq!(min_similarity, Some(0.4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_delete_requires_id_or_all() {
        assert!(Cli::try_parse_from(["tuberag", "delete"]).is_err());
        assert!(Cli::try_parse_from(["tuberag", "delete", "abc", "--all"]).is_err());

        let cli = Cli::parse_from(["tuberag", "delete", "--all"]);
        assert!(matches!(cli.command, Commands::Delete { video_id: None, all: true }));
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::parse_from(["tuberag", "-vv", "stats"]);
        assert_eq!(cli.verbose, 2);
    }
}
