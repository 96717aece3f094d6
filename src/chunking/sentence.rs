//! Sentence-aware chunking with overlap.
//!
//! Sentences are accumulated greedily into chunks of roughly `chunk_size`
//! characters. When a chunk closes, the next one is seeded with the tail of
//! the closed chunk so context carries across the boundary.

use super::{Chunk, ChunkingConfig};
use crate::error::{Result, TubeRagError};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// Sentences of this many characters or fewer are treated as noise.
const MIN_SENTENCE_CHARS: usize = 10;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:\-()]").expect("valid character filter"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence pattern"));

/// Splits transcript text into overlapping, sentence-aware chunks.
#[derive(Debug, Clone, Default)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Create a chunker with the given size and overlap (both in characters).
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self::with_config(ChunkingConfig {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from a config.
    pub fn with_config(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split text into chunks.
    ///
    /// Fails with [`TubeRagError::Chunking`] when the text holds no sentence
    /// long enough to keep.
    #[instrument(skip_all, fields(input_len = text.len()))]
    pub fn split(&self, text: &str) -> Result<Vec<Chunk>> {
        let normalized = normalize(text);
        let sentences = split_sentences(&normalized);

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut buffer = String::new();
        let mut current_length = 0usize;

        for sentence in sentences {
            let sentence_length = sentence.chars().count();

            // Only the existing buffer is checked, so an oversized sentence
            // still lands in a chunk of its own.
            if current_length + sentence_length > self.config.chunk_size && !buffer.is_empty() {
                chunks.push(Chunk::new(chunks.len(), buffer.trim().to_string()));

                if self.config.overlap > 0 {
                    let tail = overlap_tail(&buffer, self.config.overlap);
                    buffer = if tail.is_empty() {
                        sentence.to_string()
                    } else {
                        format!("{} {}", tail, sentence)
                    };
                    current_length = buffer.chars().count();
                } else {
                    buffer = sentence.to_string();
                    current_length = sentence_length;
                }
            } else {
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(sentence);
                current_length += sentence_length;
            }
        }

        let last = buffer.trim();
        if !last.is_empty() {
            chunks.push(Chunk::new(chunks.len(), last.to_string()));
        }

        if chunks.is_empty() {
            return Err(TubeRagError::Chunking(
                "no usable sentences in transcript text".to_string(),
            ));
        }

        debug!(
            chunk_count = chunks.len(),
            chunk_size = self.config.chunk_size,
            overlap = self.config.overlap,
            "Text chunked"
        );
        Ok(chunks)
    }
}

/// Strip unsafe characters, collapse whitespace and fix spacing before punctuation.
fn normalize(text: &str) -> String {
    let filtered = UNSAFE_CHARS.replace_all(text, "");
    let collapsed = WHITESPACE.replace_all(&filtered, " ");

    collapsed
        .replace(" .", ".")
        .replace(" ,", ",")
        .replace(" !", "!")
        .replace(" ?", "?")
        .trim()
        .to_string()
}

/// Split on runs of sentence terminators, dropping short fragments.
fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

/// The last `overlap` characters of `text`, advanced past the first sentence
/// terminator inside them. Text no longer than `overlap` is returned whole.
fn overlap_tail(text: &str, overlap: usize) -> String {
    let total = text.chars().count();
    if total <= overlap {
        return text.trim().to_string();
    }

    let tail: String = text.chars().skip(total - overlap).collect();

    match tail.char_indices().find(|(_, c)| matches!(c, '.' | '!' | '?')) {
        Some((i, c)) => tail[i + c.len_utf8()..].trim().to_string(),
        None => tail.trim().to_string(),
    }
}
