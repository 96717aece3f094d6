//! In-memory vector index implementation.
//!
//! Useful for testing and small datasets. Nothing is persisted.

use super::{
    check_dimensions, rank, IndexEntry, IndexStats, IndexedVideo, SearchHit, StoredChunk,
    VectorIndex,
};
use crate::embedding::EmbeddedChunk;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// In-memory vector index. Entries are kept in insertion order.
pub struct MemoryVectorIndex {
    entries: RwLock<Vec<IndexEntry>>,
}

impl MemoryVectorIndex {
    /// Create a new, empty in-memory index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<IndexEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<IndexEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn exists(&self, video_id: &str) -> bool {
        self.read().iter().any(|e| e.metadata.video_id == video_id)
    }

    async fn add(&self, video_id: &str, chunks: &[EmbeddedChunk]) -> bool {
        if chunks.is_empty() {
            warn!("No chunks given for video {}; nothing stored", video_id);
            return false;
        }

        // The exists-check and insert happen under one write lock
        let mut entries = self.write();

        if entries.iter().any(|e| e.metadata.video_id == video_id) {
            info!("Video {} already exists in index", video_id);
            return true;
        }

        let existing_dims = entries.first().map(|e| e.vector.len());
        if let Err(e) = check_dimensions(chunks, existing_dims) {
            warn!("Rejected chunks for video {}: {}", video_id, e);
            return false;
        }

        entries.extend(chunks.iter().map(|c| IndexEntry::from_chunk(video_id, c)));
        info!("Added {} chunks for video {}", chunks.len(), video_id);
        true
    }

    async fn search(&self, query: &[f32], video_id: Option<&str>, top_k: usize) -> Vec<SearchHit> {
        let entries = self.read();

        let candidates = entries
            .iter()
            .filter(|e| video_id.map_or(true, |id| e.metadata.video_id == id))
            .map(|e| (e.text.clone(), e.metadata.clone(), e.vector.clone()));

        let hits = rank(query, candidates, top_k);
        debug!("Found {} similar chunks", hits.len());
        hits
    }

    async fn get_chunks(&self, video_id: &str) -> Vec<StoredChunk> {
        self.read()
            .iter()
            .filter(|e| e.metadata.video_id == video_id)
            .map(|e| StoredChunk {
                text: e.text.clone(),
                metadata: e.metadata.clone(),
            })
            .collect()
    }

    async fn delete(&self, video_id: &str) -> bool {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|e| e.metadata.video_id != video_id);
        let deleted = before - entries.len();

        if deleted == 0 {
            info!("No chunks found for video {}", video_id);
            return false;
        }
        info!("Deleted {} chunks for video {}", deleted, video_id);
        true
    }

    async fn stats(&self) -> IndexStats {
        let entries = self.read();
        let videos: HashSet<&str> = entries.iter().map(|e| e.metadata.video_id.as_str()).collect();

        IndexStats {
            total_chunks: entries.len(),
            unique_video_count: videos.len(),
        }
    }

    async fn list_videos(&self) -> Vec<IndexedVideo> {
        let entries = self.read();
        let mut videos: Vec<IndexedVideo> = Vec::new();

        for entry in entries.iter() {
            match videos.iter_mut().find(|v| v.video_id == entry.metadata.video_id) {
                Some(video) => video.chunk_count += 1,
                None => videos.push(IndexedVideo {
                    video_id: entry.metadata.video_id.clone(),
                    chunk_count: 1,
                }),
            }
        }

        videos
    }

    async fn clear(&self) -> bool {
        self.write().clear();
        info!("Cleared in-memory index");
        true
    }
}
