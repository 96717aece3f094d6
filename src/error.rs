//! Error types for tuberag.

use thiserror::Error;

/// Library-level error type for tuberag operations.
#[derive(Error, Debug)]
pub enum TubeRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chunking failed: {0}")]
    Chunking(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Video is unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found: {0}")]
    NoTranscriptFound(String),

    #[error("Transcript source error: {0}")]
    TranscriptSource(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl TubeRagError {
    /// Whether the error is caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TubeRagError::InvalidUrl(_)
                | TubeRagError::TranscriptUnavailable(_)
                | TubeRagError::TranscriptsDisabled(_)
                | TubeRagError::NoTranscriptFound(_)
                | TubeRagError::Chunking(_)
        )
    }
}

/// Result type alias for tuberag operations.
pub type Result<T> = std::result::Result<T, TubeRagError>;
