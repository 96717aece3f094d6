//! RAG (Retrieval-Augmented Generation) for question answering over transcripts.
//!
//! The retriever turns a question into ranked transcript context; the
//! generator turns that context into an answer.

mod context;
mod generator;
mod response;

pub use context::{RankedChunk, RetrievalOutcome, RetrievalResult, Retriever, RetrieverStats};
pub use generator::{Generator, OpenAIGenerator};
pub use response::{RagEngine, RagResponse};

#[cfg(test)]
pub(crate) use generator::test_support;
