//! Pipeline orchestrator for tuberag.
//!
//! Coordinates ingestion from URL validation to indexing, and serves the
//! question-answering and housekeeping operations built on top of it. The
//! orchestrator is the single store object shared by the CLI and the HTTP
//! handlers.

use crate::chunking::{chunk_stats, ChunkStats, TextChunker};
use crate::config::{EmbeddingProvider, Prompts, Settings, VectorStoreProvider};
use crate::embedding::{embed_chunks, Embedder, OpenAIEmbedder};
use crate::error::{Result, TubeRagError};
use crate::rag::{
    Generator, OpenAIGenerator, RagEngine, RagResponse, RetrievalResult, Retriever, RetrieverStats,
};
use crate::transcript::{
    validate_url, CachedTranscriptSource, TranscriptCache, TranscriptSource, VideoUrl,
    YoutubeTranscriptSource,
};
use crate::vector_store::{IndexedVideo, MemoryVectorIndex, SqliteVectorIndex, VectorIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Counts recorded when a video is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_chunks: usize,
    /// Transcript length in characters.
    pub transcript_length: usize,
    pub total_segments: usize,
}

/// Metadata kept for videos ingested by this process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedVideo {
    pub url: VideoUrl,
    pub stats: ProcessingStats,
    pub processed_at: DateTime<Utc>,
}

/// Result of processing a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub video_id: String,
    pub url: VideoUrl,
    /// Whether processing was skipped (already indexed).
    pub skipped: bool,
    pub message: String,
    /// Present when the video was ingested by this process.
    pub stats: Option<ProcessingStats>,
    /// Chunk length distribution; present when this call ingested the video.
    pub chunk_stats: Option<ChunkStats>,
}

/// What is known about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub chunk_count: usize,
    pub status: String,
    pub url: Option<VideoUrl>,
    pub stats: Option<ProcessingStats>,
    pub processed_at: Option<DateTime<Utc>>,
    pub transcript_cached: bool,
}

/// A generated transcript summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub summary: String,
    pub transcript_length: usize,
}

/// System-wide counts and configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub retrieval: RetrieverStats,
    pub embedding_model: String,
    pub generation_model: String,
    pub processed_videos_count: usize,
}

type IngestLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// A handle on a video's ingestion lock. Dropping it prunes the lock from
/// the map once no other caller holds it, including when the owning future
/// is cancelled.
struct IngestLease<'a> {
    locks: &'a IngestLocks,
    video_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl IngestLease<'_> {
    fn lock(&self) -> &tokio::sync::Mutex<()> {
        &self.lock
    }
}

impl Drop for IngestLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map's handle plus this lease means nobody else is waiting
        if locks.get(&self.video_id).is_some_and(|l| Arc::strong_count(l) == 2) {
            locks.remove(&self.video_id);
        }
    }
}

/// The main orchestrator for the tuberag pipeline.
pub struct Orchestrator {
    settings: Settings,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    transcripts: CachedTranscriptSource,
    cache: Arc<TranscriptCache>,
    engine: RagEngine,
    chunker: TextChunker,
    processed: RwLock<HashMap<String, ProcessedVideo>>,
    ingest_locks: IngestLocks,
}

impl Orchestrator {
    /// Create a new orchestrator with the production components.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        // Load prompts (with optional custom directory and variables)
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = match settings.embedding.provider {
            EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::with_config(
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
                settings.embedding.max_input_chars,
            )?),
        };

        let index: Arc<dyn VectorIndex> = match settings.vector_store.provider {
            VectorStoreProvider::Sqlite => Arc::new(SqliteVectorIndex::open(&settings.sqlite_path())?),
            VectorStoreProvider::Memory => {
                info!("Using in-memory vector index; nothing will be persisted");
                Arc::new(MemoryVectorIndex::new())
            }
        };

        let source: Arc<dyn TranscriptSource> = Arc::new(YoutubeTranscriptSource::new(
            settings.transcript.languages.clone(),
        )?);
        let cache = Arc::new(TranscriptCache::new(settings.transcript_cache_dir()));

        let generator: Arc<dyn Generator> =
            Arc::new(OpenAIGenerator::new(&settings.generation)?.with_prompts(prompts));

        Ok(Self::with_components(settings, index, embedder, source, cache, generator))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn TranscriptSource>,
        cache: Arc<TranscriptCache>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let retriever = Retriever::new(index.clone(), embedder.clone(), settings.retrieval.top_k);
        let engine =
            RagEngine::new(retriever, generator).with_min_similarity(settings.retrieval.min_similarity);
        let chunker = TextChunker::new(settings.chunking.chunk_size, settings.chunking.overlap);

        Self {
            transcripts: CachedTranscriptSource::new(source, cache.clone()),
            settings,
            index,
            embedder,
            cache,
            engine,
            chunker,
            processed: RwLock::new(HashMap::new()),
            ingest_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the vector index.
    pub fn index(&self) -> Arc<dyn VectorIndex> {
        self.index.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    fn processed_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ProcessedVideo>> {
        self.processed.read().unwrap_or_else(|e| e.into_inner())
    }

    fn processed_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ProcessedVideo>> {
        self.processed.write().unwrap_or_else(|e| e.into_inner())
    }

    fn ingest_lease(&self, video_id: &str) -> IngestLease<'_> {
        let mut locks = self.ingest_locks.lock().unwrap_or_else(|e| e.into_inner());
        let lock = locks.entry(video_id.to_string()).or_default().clone();
        IngestLease {
            locks: &self.ingest_locks,
            video_id: video_id.to_string(),
            lock,
        }
    }

    /// Process a video: fetch its transcript, chunk, embed, and index.
    ///
    /// Concurrent calls for the same video are serialized; the later ones
    /// find the video indexed and are skipped.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn process_video(&self, url: &str) -> Result<ProcessResult> {
        let video_url = validate_url(url)?;
        let video_id = video_url.video_id.clone();

        let lease = self.ingest_lease(&video_id);
        let _guard = lease.lock().lock().await;
        self.ingest(video_url).await
    }

    async fn ingest(&self, url: VideoUrl) -> Result<ProcessResult> {
        let video_id = url.video_id.clone();

        if self.index.exists(&video_id).await {
            info!("Video {} is already indexed, skipping", video_id);
            let stats = self.processed_read().get(&video_id).map(|p| p.stats);
            return Ok(ProcessResult {
                video_id,
                url,
                skipped: true,
                message: "Video already processed".to_string(),
                stats,
                chunk_stats: None,
            });
        }

        let document = self.transcripts.fetch(&video_id).await?;

        info!("Chunking transcript...");
        let chunks = self.chunker.split(&document.full_text)?;
        let lengths = chunk_stats(&chunks);
        let total_chunks = chunks.len();
        debug!("Created {} chunks", total_chunks);

        info!("Generating embeddings for {} chunks...", total_chunks);
        let embedded = embed_chunks(self.embedder.as_ref(), chunks).await?;

        if !self.index.add(&video_id, &embedded).await {
            return Err(TubeRagError::Index(format!(
                "failed to store chunks for video {}",
                video_id
            )));
        }

        let stats = ProcessingStats {
            total_chunks,
            transcript_length: document.full_text.chars().count(),
            total_segments: document.total_segments,
        };

        self.processed_write().insert(
            video_id.clone(),
            ProcessedVideo {
                url: url.clone(),
                stats,
                processed_at: Utc::now(),
            },
        );

        info!("Indexed {} chunks for video {}", total_chunks, video_id);

        Ok(ProcessResult {
            video_id,
            url,
            skipped: false,
            message: "Video processed successfully".to_string(),
            stats: Some(stats),
            chunk_stats: Some(lengths),
        })
    }

    /// Answer a question, optionally restricted to one video.
    ///
    /// Fails with `VideoNotFound` when a video id is given but not indexed.
    pub async fn ask(&self, question: &str, video_id: Option<&str>) -> Result<RagResponse> {
        if let Some(id) = video_id {
            self.require_indexed(id).await?;
        }
        self.engine.ask(question, video_id).await
    }

    /// Answer a general question without video context.
    pub async fn ask_general(&self, question: &str) -> Result<String> {
        self.engine.ask_general(question).await
    }

    /// Retrieve ranked chunks without generating an answer.
    pub async fn search(
        &self,
        query: &str,
        video_id: Option<&str>,
        limit: Option<usize>,
        min_similarity: Option<f32>,
    ) -> Result<RetrievalResult> {
        let top_k = limit.unwrap_or(self.settings.retrieval.top_k);
        let retriever = Retriever::new(self.index.clone(), self.embedder.clone(), top_k);

        match min_similarity {
            Some(min) => retriever.retrieve_with_threshold(query, video_id, min).await,
            None => retriever.retrieve(query, video_id, None).await,
        }
    }

    async fn require_indexed(&self, video_id: &str) -> Result<()> {
        if self.index.exists(video_id).await {
            Ok(())
        } else {
            Err(TubeRagError::VideoNotFound(video_id.to_string()))
        }
    }

    /// Information about an indexed video.
    pub async fn video_info(&self, video_id: &str) -> Result<VideoInfo> {
        self.require_indexed(video_id).await?;

        let chunk_count = self.index.get_chunks(video_id).await.len();
        let processed = self.processed_read().get(video_id).cloned();

        let url = match &processed {
            Some(p) => Some(p.url.clone()),
            None => validate_url(&format!("https://www.youtube.com/watch?v={}", video_id)).ok(),
        };

        Ok(VideoInfo {
            video_id: video_id.to_string(),
            chunk_count,
            status: "processed".to_string(),
            url,
            stats: processed.as_ref().map(|p| p.stats),
            processed_at: processed.map(|p| p.processed_at),
            transcript_cached: self.cache.contains(video_id),
        })
    }

    /// Summarize an indexed video from its cached transcript.
    #[instrument(skip(self))]
    pub async fn summarize(&self, video_id: &str) -> Result<VideoSummary> {
        self.require_indexed(video_id).await?;

        let document = self.cache.get(video_id)?.ok_or_else(|| {
            TubeRagError::VideoNotFound(format!("no cached transcript for {}", video_id))
        })?;

        let summary = self.engine.generator().summarize(&document.full_text).await?;

        Ok(VideoSummary {
            video_id: video_id.to_string(),
            summary,
            transcript_length: document.full_text.chars().count(),
        })
    }

    /// Remove a video from the index, the metadata cache and the transcript cache.
    ///
    /// Returns `false` if the index held nothing for the video.
    #[instrument(skip(self))]
    pub async fn delete_video(&self, video_id: &str) -> Result<bool> {
        let deleted = self.index.delete(video_id).await;
        self.processed_write().remove(video_id);

        if let Err(e) = self.cache.clear(video_id) {
            warn!("Failed to clear cached transcript for {}: {}", video_id, e);
        }

        Ok(deleted)
    }

    /// Remove every video and cached transcript.
    pub async fn clear(&self) -> Result<()> {
        if !self.index.clear().await {
            return Err(TubeRagError::Index("failed to clear index".to_string()));
        }
        self.processed_write().clear();
        self.cache.clear_all()?;
        Ok(())
    }

    /// Indexed videos with their chunk counts.
    pub async fn list_videos(&self) -> Vec<IndexedVideo> {
        self.index.list_videos().await
    }

    /// System statistics.
    pub async fn stats(&self) -> SystemStats {
        let retrieval = self.engine.retriever().stats().await;
        let processed_videos_count = self.processed_read().len();

        SystemStats {
            retrieval,
            embedding_model: self.settings.embedding.model.clone(),
            generation_model: self.settings.generation.model.clone(),
            processed_videos_count,
        }
    }
}
