//! RAG response generation.

use super::{Generator, RetrievalResult, Retriever};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// An answer together with the retrieval that grounded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub retrieval: RetrievalResult,
    /// Whether any transcript context reached the generator.
    pub context_used: bool,
}

/// RAG engine for question answering.
pub struct RagEngine {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    min_similarity: Option<f32>,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            min_similarity: None,
        }
    }

    /// Only use chunks at or above this similarity as context.
    pub fn with_min_similarity(mut self, min_similarity: Option<f32>) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator(&self) -> Arc<dyn Generator> {
        self.generator.clone()
    }

    /// Retrieve context for a question and generate an answer from it.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&self, question: &str, video_id: Option<&str>) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        let retrieval = match self.min_similarity {
            Some(min) => {
                self.retriever
                    .retrieve_with_threshold(question, video_id, min)
                    .await?
            }
            None => self.retriever.retrieve(question, video_id, None).await?,
        };

        if !retrieval.has_context() {
            info!("{}", retrieval.message());
        }

        let answer = self.generator.generate(question, &retrieval.context).await?;

        Ok(RagResponse {
            answer,
            context_used: retrieval.has_context(),
            retrieval,
        })
    }

    /// Answer a question without consulting the index.
    #[instrument(skip(self))]
    pub async fn ask_general(&self, question: &str) -> Result<String> {
        self.generator.chat_without_context(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::test_support::KeywordEmbedder;
    use crate::embedding::Embedder;
    use crate::rag::test_support::EchoGenerator;
    use crate::rag::RetrievalOutcome;
    use crate::vector_store::test_support::embedded;
    use crate::vector_store::{MemoryVectorIndex, VectorIndex};

    async fn engine(generator: Arc<EchoGenerator>, min_similarity: Option<f32>) -> RagEngine {
        let embedder = Arc::new(KeywordEmbedder::new(&["tokio", "serde"]));
        let index = Arc::new(MemoryVectorIndex::new());

        let texts = ["tokio runtime internals", "serde derive macros"];
        let mut chunks = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            chunks.push(embedded(i, text, embedder.embed(text).await.unwrap()));
        }
        index.add("vid", &chunks).await;

        RagEngine::new(Retriever::new(index, embedder, 1), generator)
            .with_min_similarity(min_similarity)
    }

    #[tokio::test]
    async fn test_ask_passes_context_to_generator() {
        let generator = Arc::new(EchoGenerator::default());
        let engine = engine(generator.clone(), None).await;

        let response = engine.ask("how does tokio work", Some("vid")).await.unwrap();

        assert_eq!(response.answer, "answer to: how does tokio work");
        assert!(response.context_used);
        assert_eq!(
            generator.contexts.lock().unwrap().as_slice(),
            ["tokio runtime internals".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ask_below_threshold_generates_without_context() {
        let generator = Arc::new(EchoGenerator::default());
        let engine = engine(generator.clone(), Some(0.9)).await;

        let response = engine.ask("unrelated question", Some("vid")).await.unwrap();

        assert!(!response.context_used);
        assert_eq!(
            response.retrieval.outcome,
            RetrievalOutcome::BelowThreshold { threshold: 0.9 }
        );
        assert_eq!(generator.contexts.lock().unwrap().as_slice(), [String::new()]);
    }

    #[tokio::test]
    async fn test_ask_unknown_video() {
        let engine = engine(Arc::new(EchoGenerator::default()), None).await;

        let response = engine.ask("tokio", Some("missing")).await.unwrap();
        assert_eq!(response.retrieval.outcome, RetrievalOutcome::NoHits);
        assert!(!response.context_used);
    }

    #[tokio::test]
    async fn test_ask_general() {
        let engine = engine(Arc::new(EchoGenerator::default()), None).await;
        let answer = engine.ask_general("what is a monad").await.unwrap();
        assert_eq!(answer, "general answer to: what is a monad");
    }
}
