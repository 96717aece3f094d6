//! tuberag - question answering over YouTube video transcripts
//!
//! Fetches a video's transcript, splits it into overlapping chunks, embeds
//! the chunks into a vector index, and answers questions with a chat model
//! grounded in the most similar chunks.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `transcript` - URL validation, transcript fetching and caching
//! - `chunking` - Sentence-aware chunking with overlap
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector index abstraction (SQLite, in-memory)
//! - `rag` - Retrieval and answer generation
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tuberag::config::Settings;
//! use tuberag::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator
//!         .process_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!         .await?;
//!     println!("Processed {}", result.video_id);
//!
//!     let response = orchestrator
//!         .ask("What is the video about?", Some(&result.video_id))
//!         .await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;

pub use error::{Result, TubeRagError};
