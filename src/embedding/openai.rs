//! OpenAI embeddings implementation.

use super::{check_input_lengths, Embedder};
use crate::error::{Result, TubeRagError};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI caps the number of inputs per embeddings request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    max_input_chars: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", 1536, 8000)
    }

    /// Create a new OpenAI embedder with custom model, dimensions and input limit.
    pub fn with_config(model: &str, dimensions: usize, max_input_chars: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(TubeRagError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
            max_input_chars,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| TubeRagError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        check_input_lengths(texts, self.max_input_chars)?;

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(batch.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| TubeRagError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| TubeRagError::Embedding(format!("Embedding API error: {}", e)))?;

            if response.data.len() != batch.len() {
                return Err(TubeRagError::Embedding(format!(
                    "expected {} embeddings, received {}",
                    batch.len(),
                    response.data.len()
                )));
            }

            // Sort by index to keep positional correspondence with the input
            let mut embeddings = response.data;
            embeddings.sort_by_key(|e| e.index);
            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::new().unwrap();
        assert_eq!(embedder.dimensions(), 1536);
        assert_eq!(embedder.model(), "text-embedding-3-small");

        let embedder = OpenAIEmbedder::with_config("text-embedding-3-large", 3072, 8000).unwrap();
        assert_eq!(embedder.dimensions(), 3072);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(OpenAIEmbedder::with_config("text-embedding-3-small", 0, 8000).is_err());
    }

    #[tokio::test]
    async fn test_overlong_input_fails_before_request() {
        let embedder = OpenAIEmbedder::with_config("text-embedding-3-small", 8, 16).unwrap();
        let err = embedder
            .embed_batch(&["this text is far longer than sixteen characters".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TubeRagError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let embedder = OpenAIEmbedder::new().unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
