//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::chunking::Chunk;
use crate::error::{Result, TubeRagError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// The output has one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Embed chunks with a single batch call, pairing each chunk with its vector.
#[instrument(skip_all, fields(count = chunks.len()))]
pub async fn embed_chunks(embedder: &dyn Embedder, chunks: Vec<Chunk>) -> Result<Vec<EmbeddedChunk>> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;

    if vectors.len() != chunks.len() {
        return Err(TubeRagError::Embedding(format!(
            "expected {} embeddings, received {}",
            chunks.len(),
            vectors.len()
        )));
    }

    Ok(chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
        .collect())
}

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns `0.0` when either vector has zero norm, when the lengths differ,
/// or when the vectors are empty.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Reject texts longer than `max_chars` characters.
pub(crate) fn check_input_lengths(texts: &[String], max_chars: usize) -> Result<()> {
    for (i, text) in texts.iter().enumerate() {
        let len = text.chars().count();
        if len > max_chars {
            return Err(TubeRagError::Embedding(format!(
                "input {} is {} characters, exceeding the model limit of {}",
                i, len, max_chars
            )));
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds a text as `[length, vowel count]`.
    struct CountingEmbedder;

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_embed_chunks_preserves_order() {
        let chunks = vec![
            Chunk::new(0, "aaaa".to_string()),
            Chunk::new(1, "xyz".to_string()),
        ];

        let embedded = embed_chunks(&CountingEmbedder, chunks).await.unwrap();
        assert_eq!(embedded.len(), 2);
        assert_eq!(embedded[0].chunk.sequence_index, 0);
        assert_eq!(embedded[0].vector, vec![4.0, 4.0]);
        assert_eq!(embedded[1].vector, vec![3.0, 0.0]);
    }

    #[test]
    fn test_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(similarity(&a, &c).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_similarity_zero_vector() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![0.3, -0.2, 0.9];
        assert_eq!(similarity(&zero, &v), 0.0);
        assert_eq!(similarity(&v, &zero), 0.0);
    }

    #[test]
    fn test_similarity_mismatched_lengths() {
        assert_eq!(similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_check_input_lengths() {
        let texts = vec!["short".to_string(), "x".repeat(20)];
        assert!(check_input_lengths(&texts, 20).is_ok());

        let err = check_input_lengths(&texts, 10).unwrap_err();
        assert!(matches!(err, TubeRagError::Embedding(_)));
    }
}
