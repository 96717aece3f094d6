//! SQLite-based vector index implementation.
//!
//! Uses SQLite for durable storage with cosine similarity computed in Rust.
//! Entries carry an autoincrement sequence so scans return them in insertion
//! order, which keeps tie-breaking in search results stable.

use super::{
    check_dimensions, rank, EntryMetadata, IndexEntry, IndexStats, IndexedVideo, SearchHit,
    StoredChunk, VectorIndex,
};
use crate::embedding::EmbeddedChunk;
use crate::error::{Result, TubeRagError};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        video_id TEXT NOT NULL,
        sequence_index INTEGER NOT NULL,
        char_length INTEGER NOT NULL,
        text TEXT NOT NULL,
        vector BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_video_id ON entries(video_id);
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) a vector index at the given path.
    ///
    /// Fails if the storage directory cannot be created or the database is
    /// unreadable or corrupt.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TubeRagError::Index(format!("Cannot create storage directory {:?}: {}", parent, e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| TubeRagError::Index(format!("Cannot open index at {:?}: {}", path, e)))?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| TubeRagError::Index(format!("Index at {:?} is unusable: {}", path, e)))?;

        let status: String = conn
            .query_row("PRAGMA quick_check", [], |row| row.get(0))
            .map_err(|e| TubeRagError::Index(format!("Index at {:?} is unusable: {}", path, e)))?;
        if status != "ok" {
            return Err(TubeRagError::Index(format!(
                "Index at {:?} failed integrity check: {}",
                path, status
            )));
        }

        let index = Self::init(conn)?;
        info!("Initialized SQLite vector index at {:?}", path);
        Ok(index)
    }

    /// Create an in-memory SQLite index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| TubeRagError::Index(format!("Failed to create schema: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TubeRagError::Index(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize a vector to little-endian bytes.
    fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize a vector from little-endian bytes.
    fn bytes_to_vector(bytes: &[u8]) -> Option<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    fn read_metadata(row: &Row<'_>) -> rusqlite::Result<EntryMetadata> {
        let sequence_index: i64 = row.get("sequence_index")?;
        let char_length: i64 = row.get("char_length")?;
        Ok(EntryMetadata {
            video_id: row.get("video_id")?,
            sequence_index: sequence_index as usize,
            char_length: char_length as usize,
        })
    }

    fn read_candidate(row: &Row<'_>) -> rusqlite::Result<(String, EntryMetadata, Vec<u8>)> {
        Ok((row.get("text")?, Self::read_metadata(row)?, row.get("vector")?))
    }

    fn try_exists(&self, video_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE video_id = ?1)",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a video's entries; `Ok(0)` when it is already indexed.
    fn try_add(&self, video_id: &str, chunks: &[EmbeddedChunk]) -> Result<usize> {
        let mut conn = self.lock()?;

        // Immediate transaction so the exists-check and insert are atomic
        // with respect to other writers on the same database file.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE video_id = ?1)",
            params![video_id],
            |row| row.get(0),
        )?;
        if exists {
            return Ok(0);
        }

        let existing_dims: Option<i64> = tx
            .query_row("SELECT length(vector) FROM entries LIMIT 1", [], |row| row.get(0))
            .optional()?;
        check_dimensions(chunks, existing_dims.map(|bytes| bytes as usize / 4))
            .map_err(TubeRagError::Index)?;

        let indexed_at = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (id, video_id, sequence_index, char_length, text, vector, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;

            for chunk in chunks {
                let entry = IndexEntry::from_chunk(video_id, chunk);
                stmt.execute(params![
                    entry.id,
                    entry.metadata.video_id,
                    entry.metadata.sequence_index as i64,
                    entry.metadata.char_length as i64,
                    entry.text,
                    Self::vector_to_bytes(&entry.vector),
                    indexed_at,
                ])?;
            }
        }

        tx.commit()?;
        Ok(chunks.len())
    }

    fn try_search(
        &self,
        query: &[f32],
        video_id: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let conn = self.lock()?;

        let rows: Vec<(String, EntryMetadata, Vec<u8>)> = match video_id {
            Some(id) => {
                let mut stmt = conn.prepare(
                    "SELECT video_id, sequence_index, char_length, text, vector
                     FROM entries WHERE video_id = ?1 ORDER BY seq",
                )?;
                let rows = stmt.query_map(params![id], Self::read_candidate)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT video_id, sequence_index, char_length, text, vector
                     FROM entries ORDER BY seq",
                )?;
                let rows = stmt.query_map([], Self::read_candidate)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };

        let candidates = rows.into_iter().filter_map(|(text, metadata, bytes)| {
            match Self::bytes_to_vector(&bytes) {
                Some(vector) => Some((text, metadata, vector)),
                None => {
                    warn!(
                        "Skipping corrupt vector for {}",
                        super::entry_id(&metadata.video_id, metadata.sequence_index)
                    );
                    None
                }
            }
        });

        Ok(rank(query, candidates, top_k))
    }

    fn try_get_chunks(&self, video_id: &str) -> Result<Vec<StoredChunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT video_id, sequence_index, char_length, text
             FROM entries WHERE video_id = ?1 ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![video_id], |row| {
            Ok(StoredChunk {
                text: row.get("text")?,
                metadata: Self::read_metadata(row)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn try_delete(&self, video_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM entries WHERE video_id = ?1", params![video_id])?)
    }

    fn try_stats(&self) -> Result<IndexStats> {
        let conn = self.lock()?;
        let (total, videos): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT video_id) FROM entries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(IndexStats {
            total_chunks: total as usize,
            unique_video_count: videos as usize,
        })
    }

    fn try_list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT video_id, COUNT(*) FROM entries GROUP BY video_id ORDER BY MIN(seq)",
        )?;

        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(IndexedVideo {
                video_id: row.get(0)?,
                chunk_count: count as usize,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn try_clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM entries", [])?)
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn exists(&self, video_id: &str) -> bool {
        self.try_exists(video_id).unwrap_or_else(|e| {
            warn!("Error checking if video {} exists: {}", video_id, e);
            false
        })
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn add(&self, video_id: &str, chunks: &[EmbeddedChunk]) -> bool {
        if chunks.is_empty() {
            warn!("No chunks given for video {}; nothing stored", video_id);
            return false;
        }

        match self.try_add(video_id, chunks) {
            Ok(0) => {
                info!("Video {} already exists in index", video_id);
                true
            }
            Ok(n) => {
                info!("Added {} chunks for video {}", n, video_id);
                true
            }
            Err(e) => {
                warn!("Error adding chunks for video {}: {}", video_id, e);
                false
            }
        }
    }

    #[instrument(skip(self, query))]
    async fn search(&self, query: &[f32], video_id: Option<&str>, top_k: usize) -> Vec<SearchHit> {
        match self.try_search(query, video_id, top_k) {
            Ok(hits) => {
                debug!("Found {} similar chunks", hits.len());
                hits
            }
            Err(e) => {
                warn!("Error searching index: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_chunks(&self, video_id: &str) -> Vec<StoredChunk> {
        self.try_get_chunks(video_id).unwrap_or_else(|e| {
            warn!("Error getting chunks for video {}: {}", video_id, e);
            Vec::new()
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, video_id: &str) -> bool {
        match self.try_delete(video_id) {
            Ok(0) => {
                info!("No chunks found for video {}", video_id);
                false
            }
            Ok(n) => {
                info!("Deleted {} chunks for video {}", n, video_id);
                true
            }
            Err(e) => {
                warn!("Error deleting chunks for video {}: {}", video_id, e);
                false
            }
        }
    }

    async fn stats(&self) -> IndexStats {
        self.try_stats().unwrap_or_else(|e| {
            warn!("Error reading index stats: {}", e);
            IndexStats::default()
        })
    }

    async fn list_videos(&self) -> Vec<IndexedVideo> {
        self.try_list_videos().unwrap_or_else(|e| {
            warn!("Error listing videos: {}", e);
            Vec::new()
        })
    }

    async fn clear(&self) -> bool {
        match self.try_clear() {
            Ok(n) => {
                info!("Cleared {} entries from index", n);
                true
            }
            Err(e) => {
                warn!("Error clearing index: {}", e);
                false
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        match self.try_stats() {
            Ok(_) => true,
            Err(e) => {
                warn!("Index health check failed: {}", e);
                false
            }
        }
    }
}
