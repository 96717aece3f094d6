//! Vector index abstraction for tuberag.
//!
//! Provides a trait-based interface over per-video partitioned vector
//! storage. Entries are tagged with the video they came from so searches can
//! be restricted to a single video.
//!
//! Runtime storage failures never propagate out of the index: they are
//! logged and converted into `false` or an empty result, so one bad video
//! cannot take the service down. Failures while opening the index are fatal.

mod memory;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use crate::embedding::{similarity, EmbeddedChunk};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Metadata stored alongside each entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Video this entry belongs to.
    pub video_id: String,
    /// Position of the chunk in the video's transcript.
    pub sequence_index: usize,
    /// Length of the chunk text in characters.
    pub char_length: usize,
}

/// A persisted record in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// `{video_id}_{sequence_index}`.
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Build the entry for a chunk of the given video.
    pub fn from_chunk(video_id: &str, chunk: &EmbeddedChunk) -> Self {
        Self {
            id: entry_id(video_id, chunk.chunk.sequence_index),
            text: chunk.chunk.text.clone(),
            vector: chunk.vector.clone(),
            metadata: EntryMetadata {
                video_id: video_id.to_string(),
                sequence_index: chunk.chunk.sequence_index,
                char_length: chunk.chunk.char_length,
            },
        }
    }
}

/// Deterministic entry id for a chunk.
pub fn entry_id(video_id: &str, sequence_index: usize) -> String {
    format!("{}_{}", video_id, sequence_index)
}

/// A search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub metadata: EntryMetadata,
    /// Cosine distance to the query.
    pub distance: f32,
    /// `1 - distance`; higher is better.
    pub similarity: f32,
}

/// A stored chunk without its vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub text: String,
    pub metadata: EntryMetadata,
}

/// Index-wide counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub unique_video_count: usize,
}

/// Summary of one indexed video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedVideo {
    pub video_id: String,
    pub chunk_count: usize,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether at least one entry is stored for the video.
    async fn exists(&self, video_id: &str) -> bool;

    /// Insert one entry per chunk as a single batch.
    ///
    /// Returns `true` without writing anything if the video is already
    /// indexed, and `false` if the write failed or `chunks` is empty.
    async fn add(&self, video_id: &str, chunks: &[EmbeddedChunk]) -> bool;

    /// Nearest entries to `query`, most similar first, at most `top_k`.
    ///
    /// When `video_id` is given only that video's entries are considered.
    async fn search(&self, query: &[f32], video_id: Option<&str>, top_k: usize) -> Vec<SearchHit>;

    /// All chunks stored for a video, in no particular order.
    async fn get_chunks(&self, video_id: &str) -> Vec<StoredChunk>;

    /// Remove every entry for a video. Returns `false` if none existed.
    async fn delete(&self, video_id: &str) -> bool;

    /// Entry and video counts.
    async fn stats(&self) -> IndexStats;

    /// Indexed videos with their chunk counts.
    async fn list_videos(&self) -> Vec<IndexedVideo>;

    /// Remove every entry in the index.
    async fn clear(&self) -> bool;

    /// Whether the backing store can currently be read.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Check that a batch is non-degenerate and matches the index dimensionality.
pub(crate) fn check_dimensions(
    chunks: &[EmbeddedChunk],
    existing: Option<usize>,
) -> Result<(), String> {
    let Some(first) = chunks.first() else {
        return Ok(());
    };

    let dims = first.vector.len();
    if dims == 0 {
        return Err("empty embedding vector".to_string());
    }
    if let Some(bad) = chunks.iter().find(|c| c.vector.len() != dims) {
        return Err(format!(
            "chunk {} has {} dimensions, expected {}",
            bad.chunk.sequence_index,
            bad.vector.len(),
            dims
        ));
    }
    match existing {
        Some(expected) if expected != dims => Err(format!(
            "index holds {}-dimensional vectors, batch has {}",
            expected, dims
        )),
        _ => Ok(()),
    }
}

/// Score candidates against the query and keep the `top_k` best.
///
/// Candidates must arrive in insertion order; the sort is stable so ties keep it.
pub(crate) fn rank<I>(query: &[f32], candidates: I, top_k: usize) -> Vec<SearchHit>
where
    I: IntoIterator<Item = (String, EntryMetadata, Vec<f32>)>,
{
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .map(|(text, metadata, vector)| {
            let distance = 1.0 - similarity(query, &vector);
            SearchHit {
                text,
                metadata,
                distance,
                similarity: 1.0 - distance,
            }
        })
        .collect();

    hits.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal));
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::chunking::Chunk;
    use crate::embedding::EmbeddedChunk;

    pub fn embedded(index: usize, text: &str, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk::new(index, text.to_string()),
            vector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::embedded;
    use super::*;

    fn meta(video_id: &str, sequence_index: usize) -> EntryMetadata {
        EntryMetadata {
            video_id: video_id.to_string(),
            sequence_index,
            char_length: 1,
        }
    }

    #[test]
    fn test_entry_id() {
        assert_eq!(entry_id("dQw4w9WgXcQ", 3), "dQw4w9WgXcQ_3");

        let entry = IndexEntry::from_chunk("vid", &embedded(7, "text", vec![1.0]));
        assert_eq!(entry.id, "vid_7");
        assert_eq!(entry.metadata.sequence_index, 7);
        assert_eq!(entry.metadata.char_length, 4);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let candidates = vec![
            ("far".to_string(), meta("v", 0), vec![0.0, 1.0]),
            ("near".to_string(), meta("v", 1), vec![1.0, 0.0]),
            ("mid".to_string(), meta("v", 2), vec![1.0, 1.0]),
        ];

        let hits = rank(&[1.0, 0.0], candidates, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "near");
        assert_eq!(hits[1].text, "mid");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert!((hits[0].distance).abs() < 1e-6);
        assert!((hits[1].similarity + hits[1].distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let candidates = vec![
            ("first".to_string(), meta("v", 0), vec![1.0, 0.0]),
            ("second".to_string(), meta("v", 1), vec![2.0, 0.0]),
            ("third".to_string(), meta("v", 2), vec![3.0, 0.0]),
        ];

        let hits = rank(&[1.0, 0.0], candidates, 3);
        let texts: Vec<_> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_check_dimensions() {
        let good = vec![embedded(0, "a", vec![1.0, 0.0]), embedded(1, "b", vec![0.0, 1.0])];
        assert!(check_dimensions(&good, None).is_ok());
        assert!(check_dimensions(&good, Some(2)).is_ok());
        assert!(check_dimensions(&good, Some(3)).is_err());

        let ragged = vec![embedded(0, "a", vec![1.0, 0.0]), embedded(1, "b", vec![1.0])];
        assert!(check_dimensions(&ragged, None).is_err());

        assert!(check_dimensions(&[embedded(0, "a", vec![])], None).is_err());
        assert!(check_dimensions(&[], Some(4)).is_ok());
    }
}
