//! Context retrieval for RAG responses.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{IndexStats, SearchHit, VectorIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Characters of chunk text shown per ranked chunk.
const DISPLAY_CHARS: usize = 200;

/// How a retrieval ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    /// At least one chunk was retrieved.
    Found,
    /// The index returned nothing for the query.
    NoHits,
    /// Chunks were found but none reached the threshold.
    BelowThreshold { threshold: f32 },
}

/// A retrieved chunk prepared for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChunk {
    /// Chunk text, truncated for display.
    pub text: String,
    /// Similarity rounded to three decimals.
    pub similarity: f32,
    pub sequence_index: usize,
    pub video_id: String,
}

impl RankedChunk {
    fn from_hit(hit: &SearchHit) -> Self {
        Self {
            text: truncate_for_display(&hit.text),
            similarity: round3(hit.similarity),
            sequence_index: hit.metadata.sequence_index,
            video_id: hit.metadata.video_id.clone(),
        }
    }
}

/// The context assembled for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub video_id: Option<String>,
    /// Full texts of the retrieved chunks, separated by blank lines.
    pub context: String,
    pub ranked_chunks: Vec<RankedChunk>,
    pub outcome: RetrievalOutcome,
}

impl RetrievalResult {
    fn from_hits(query: &str, video_id: Option<&str>, hits: &[SearchHit], empty: RetrievalOutcome) -> Self {
        let outcome = if hits.is_empty() { empty } else { RetrievalOutcome::Found };

        Self {
            query: query.to_string(),
            video_id: video_id.map(|s| s.to_string()),
            context: hits
                .iter()
                .map(|h| h.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            ranked_chunks: hits.iter().map(RankedChunk::from_hit).collect(),
            outcome,
        }
    }

    /// Whether any context was retrieved.
    pub fn has_context(&self) -> bool {
        self.outcome == RetrievalOutcome::Found
    }

    /// Human-readable description of the outcome.
    pub fn message(&self) -> String {
        match self.outcome {
            RetrievalOutcome::Found => {
                format!("Retrieved {} relevant chunks", self.ranked_chunks.len())
            }
            RetrievalOutcome::NoHits => "No relevant context found".to_string(),
            RetrievalOutcome::BelowThreshold { threshold } => {
                format!("No chunks found above similarity threshold {}", threshold)
            }
        }
    }
}

/// Retrieval configuration and index counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverStats {
    pub index: IndexStats,
    pub embedding_dimensions: usize,
    pub top_k: usize,
}

/// Retrieves ranked context for queries.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    /// Create a new retriever returning up to `top_k` chunks per query.
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    async fn search(&self, query: &str, video_id: Option<&str>, top_k: usize) -> Result<Vec<SearchHit>> {
        let query_vector = self.embedder.embed(query).await?;
        Ok(self.index.search(&query_vector, video_id, top_k).await)
    }

    /// Retrieve the chunks most similar to `query`.
    ///
    /// An empty index or filter is reported through the outcome, not as an error.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve(
        &self,
        query: &str,
        video_id: Option<&str>,
        top_k: Option<usize>,
    ) -> Result<RetrievalResult> {
        let hits = self
            .search(query, video_id, top_k.unwrap_or(self.top_k))
            .await?;

        if hits.is_empty() {
            info!("No relevant context found");
        } else {
            debug!("Retrieved {} relevant chunks", hits.len());
        }

        Ok(RetrievalResult::from_hits(query, video_id, &hits, RetrievalOutcome::NoHits))
    }

    /// Retrieve, keeping only chunks whose displayed similarity reaches `min_similarity`.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve_with_threshold(
        &self,
        query: &str,
        video_id: Option<&str>,
        min_similarity: f32,
    ) -> Result<RetrievalResult> {
        let hits = self.search(query, video_id, self.top_k).await?;
        if hits.is_empty() {
            info!("No relevant context found");
            return Ok(RetrievalResult::from_hits(query, video_id, &hits, RetrievalOutcome::NoHits));
        }

        let kept: Vec<SearchHit> = hits
            .into_iter()
            .filter(|h| round3(h.similarity) >= min_similarity)
            .collect();

        debug!("{} chunks at or above threshold {}", kept.len(), min_similarity);

        Ok(RetrievalResult::from_hits(
            query,
            video_id,
            &kept,
            RetrievalOutcome::BelowThreshold {
                threshold: min_similarity,
            },
        ))
    }

    /// Index counts plus retrieval configuration.
    pub async fn stats(&self) -> RetrieverStats {
        RetrieverStats {
            index: self.index.stats().await,
            embedding_dimensions: self.embedder.dimensions(),
            top_k: self.top_k,
        }
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

fn truncate_for_display(text: &str) -> String {
    if text.chars().count() > DISPLAY_CHARS {
        let head: String = text.chars().take(DISPLAY_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::test_support::KeywordEmbedder;
    use crate::vector_store::test_support::embedded;
    use crate::vector_store::MemoryVectorIndex;

    async fn retriever_with(entries: &[(&str, Vec<&str>)], top_k: usize) -> Retriever {
        let embedder = Arc::new(KeywordEmbedder::new(&["rust", "python", "cooking"]));
        let index = Arc::new(MemoryVectorIndex::new());

        for (video_id, texts) in entries {
            let mut chunks = Vec::new();
            for (i, text) in texts.iter().enumerate() {
                chunks.push(embedded(i, text, embedder.embed(text).await.unwrap()));
            }
            index.add(video_id, &chunks).await;
        }

        Retriever::new(index, embedder, top_k)
    }

    #[tokio::test]
    async fn test_retrieve_builds_context() {
        let retriever = retriever_with(
            &[(
                "vid",
                vec!["rust rust ownership", "python scripting", "cooking pasta with rust pans"],
            )],
            2,
        )
        .await;

        let result = retriever.retrieve("rust", Some("vid"), None).await.unwrap();

        assert_eq!(result.outcome, RetrievalOutcome::Found);
        assert_eq!(result.ranked_chunks.len(), 2);
        assert_eq!(result.ranked_chunks[0].sequence_index, 0);
        assert_eq!(
            result.context,
            "rust rust ownership\n\ncooking pasta with rust pans"
        );
        assert!(result.ranked_chunks[0].similarity >= result.ranked_chunks[1].similarity);
        assert_eq!(result.message(), "Retrieved 2 relevant chunks");
    }

    #[tokio::test]
    async fn test_retrieve_empty_index() {
        let retriever = retriever_with(&[], 5).await;

        let result = retriever.retrieve("rust", None, None).await.unwrap();
        assert_eq!(result.outcome, RetrievalOutcome::NoHits);
        assert!(result.context.is_empty());
        assert!(result.ranked_chunks.is_empty());
        assert!(!result.has_context());
    }

    #[tokio::test]
    async fn test_threshold_is_distinct_from_no_hits() {
        let retriever = retriever_with(&[("vid", vec!["python python", "cooking at home"])], 5).await;

        let result = retriever
            .retrieve_with_threshold("rust", Some("vid"), 0.5)
            .await
            .unwrap();

        assert_eq!(result.outcome, RetrievalOutcome::BelowThreshold { threshold: 0.5 });
        assert!(result.context.is_empty());
        assert_eq!(result.message(), "No chunks found above similarity threshold 0.5");

        let empty = retriever_with(&[], 5).await;
        let result = empty.retrieve_with_threshold("rust", None, 0.5).await.unwrap();
        assert_eq!(result.outcome, RetrievalOutcome::NoHits);
    }

    #[tokio::test]
    async fn test_threshold_keeps_full_text_context() {
        let long_text = format!("rust {}", "x".repeat(300));
        let retriever = retriever_with(&[("vid", vec![long_text.as_str(), "python only"])], 5).await;

        let result = retriever
            .retrieve_with_threshold("rust", Some("vid"), 0.9)
            .await
            .unwrap();

        assert_eq!(result.outcome, RetrievalOutcome::Found);
        assert_eq!(result.ranked_chunks.len(), 1);
        assert_eq!(result.context, long_text);
        assert_eq!(result.ranked_chunks[0].text.chars().count(), DISPLAY_CHARS + 3);
        assert!(result.ranked_chunks[0].text.ends_with("..."));
    }

    #[tokio::test]
    async fn test_retrieve_is_isolated_per_video() {
        let retriever = retriever_with(
            &[("a", vec!["rust in video a"]), ("b", vec!["rust in video b"])],
            5,
        )
        .await;

        let result = retriever.retrieve("rust", Some("a"), None).await.unwrap();
        assert!(result.ranked_chunks.iter().all(|c| c.video_id == "a"));
        assert_eq!(result.video_id.as_deref(), Some("a"));

        let all = retriever.retrieve("rust", None, Some(1)).await.unwrap();
        assert_eq!(all.ranked_chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let retriever = retriever_with(&[("a", vec!["rust one", "rust two"])], 4).await;
        let stats = retriever.stats().await;

        assert_eq!(stats.index.total_chunks, 2);
        assert_eq!(stats.index.unique_video_count, 1);
        assert_eq!(stats.embedding_dimensions, 3);
        assert_eq!(stats.top_k, 4);
    }

    #[test]
    fn test_display_helpers() {
        assert_eq!(round3(0.123456), 0.123);
        assert_eq!(truncate_for_display("short"), "short");
        assert_eq!(truncate_for_display(&"é".repeat(201)).chars().count(), 203);
    }
}
