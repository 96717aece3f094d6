//! Transcript chunking for embedding and retrieval.
//!
//! Transcripts are split into overlapping, sentence-aware chunks. Each chunk
//! is the unit that gets embedded, stored and retrieved.

mod sentence;

pub use sentence::TextChunker;

use serde::{Deserialize, Serialize};

/// A bounded slice of transcript text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in the transcript (0-based, contiguous).
    pub sequence_index: usize,
    /// Chunk text.
    pub text: String,
    /// Length of `text` in characters.
    pub char_length: usize,
}

impl Chunk {
    /// Create a new chunk, measuring its length in characters.
    pub fn new(sequence_index: usize, text: String) -> Self {
        let char_length = text.chars().count();
        Self {
            sequence_index,
            text,
            char_length,
        }
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    /// Zero disables overlap.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Summary statistics for a set of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub total_length: usize,
    pub avg_length: f64,
    pub min_length: usize,
    pub max_length: usize,
}

/// Compute statistics about produced chunks.
pub fn chunk_stats(chunks: &[Chunk]) -> ChunkStats {
    if chunks.is_empty() {
        return ChunkStats {
            total_chunks: 0,
            total_length: 0,
            avg_length: 0.0,
            min_length: 0,
            max_length: 0,
        };
    }

    let total_length: usize = chunks.iter().map(|c| c.char_length).sum();
    let avg_length = total_length as f64 / chunks.len() as f64;

    ChunkStats {
        total_chunks: chunks.len(),
        total_length,
        avg_length: (avg_length * 100.0).round() / 100.0,
        min_length: chunks.iter().map(|c| c.char_length).min().unwrap_or(0),
        max_length: chunks.iter().map(|c| c.char_length).max().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_counts_chars_not_bytes() {
        let chunk = Chunk::new(0, "héllo wörld".to_string());
        assert_eq!(chunk.char_length, 11);
    }

    #[test]
    fn test_chunk_stats() {
        let chunks = vec![
            Chunk::new(0, "a".repeat(10)),
            Chunk::new(1, "b".repeat(20)),
            Chunk::new(2, "c".repeat(5)),
        ];

        let stats = chunk_stats(&chunks);
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.total_length, 35);
        assert_eq!(stats.avg_length, 11.67);
        assert_eq!(stats.min_length, 5);
        assert_eq!(stats.max_length, 20);
    }

    #[test]
    fn test_chunk_stats_empty() {
        let stats = chunk_stats(&[]);
        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.avg_length, 0.0);
    }
}
