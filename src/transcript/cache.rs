//! On-disk transcript cache, one JSON file per video.

use super::{is_valid_video_id, TranscriptDocument, TranscriptSource};
use crate::error::{Result, TubeRagError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Directory of cached transcripts keyed by video id.
pub struct TranscriptCache {
    dir: PathBuf,
}

impl TranscriptCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, video_id: &str) -> Result<PathBuf> {
        if !is_valid_video_id(video_id) {
            return Err(TubeRagError::InvalidUrl(format!("Invalid video id: {}", video_id)));
        }
        Ok(self.dir.join(format!("{}.json", video_id)))
    }

    /// Whether a transcript file exists for the video.
    pub fn contains(&self, video_id: &str) -> bool {
        self.path_for(video_id).is_ok_and(|path| path.exists())
    }

    /// Load a cached transcript. A corrupt cache file counts as a miss.
    pub fn get(&self, video_id: &str) -> Result<Option<TranscriptDocument>> {
        let path = self.path_for(video_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read(&path)?;
        match serde_json::from_slice(&content) {
            Ok(doc) => {
                debug!("Loaded cached transcript for video {}", video_id);
                Ok(Some(doc))
            }
            Err(e) => {
                warn!("Ignoring corrupt transcript cache {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Store a transcript, replacing any previous copy.
    pub fn put(&self, doc: &TranscriptDocument) -> Result<()> {
        let path = self.path_for(&doc.video_id)?;
        std::fs::create_dir_all(&self.dir)?;

        let content = serde_json::to_string_pretty(doc)?;
        std::fs::write(&path, content)?;

        info!(
            "Transcript saved for video {} ({} segments)",
            doc.video_id, doc.total_segments
        );
        Ok(())
    }

    /// Remove one cached transcript. Returns whether a file was removed.
    pub fn clear(&self, video_id: &str) -> Result<bool> {
        let path = self.path_for(video_id)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        info!("Cache cleared for video {}", video_id);
        Ok(true)
    }

    /// Remove every cached transcript. Returns the number of files removed.
    pub fn clear_all(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }

        info!("Cleared {} cached transcripts", removed);
        Ok(removed)
    }
}

/// A transcript source that consults the cache before fetching.
pub struct CachedTranscriptSource {
    inner: Arc<dyn TranscriptSource>,
    cache: Arc<TranscriptCache>,
}

impl CachedTranscriptSource {
    pub fn new(inner: Arc<dyn TranscriptSource>, cache: Arc<TranscriptCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl TranscriptSource for CachedTranscriptSource {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<TranscriptDocument> {
        if let Some(doc) = self.cache.get(video_id)? {
            info!("Using cached transcript for video {}", video_id);
            return Ok(doc);
        }

        let doc = self.inner.fetch(video_id).await?;
        if let Err(e) = self.cache.put(&doc) {
            warn!("Failed to cache transcript for video {}: {}", video_id, e);
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::test_support::StaticTranscriptSource;
    use crate::transcript::TranscriptSegment;
    use std::sync::atomic::Ordering;

    const VIDEO: &str = "dQw4w9WgXcQ";

    fn document(video_id: &str) -> TranscriptDocument {
        TranscriptDocument::from_segments(
            video_id,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            vec![TranscriptSegment {
                start: 0.0,
                duration: 3.0,
                text: "never gonna give you up".to_string(),
            }],
        )
    }

    #[test]
    fn test_put_get_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscriptCache::new(dir.path().join("transcripts"));

        assert!(cache.get(VIDEO).unwrap().is_none());
        assert!(!cache.contains(VIDEO));

        let doc = document(VIDEO);
        cache.put(&doc).unwrap();
        assert!(cache.dir().join(format!("{}.json", VIDEO)).exists());
        assert_eq!(cache.get(VIDEO).unwrap(), Some(doc));

        assert!(cache.clear(VIDEO).unwrap());
        assert!(!cache.clear(VIDEO).unwrap());
        assert!(cache.get(VIDEO).unwrap().is_none());
    }

    #[test]
    fn test_clear_all() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscriptCache::new(dir.path());

        cache.put(&document("aaaaaaaaaaa")).unwrap();
        cache.put(&document("bbbbbbbbbbb")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        assert_eq!(cache.clear_all().unwrap(), 2);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscriptCache::new(dir.path());
        std::fs::write(dir.path().join(format!("{}.json", VIDEO)), "{not json").unwrap();

        assert!(cache.get(VIDEO).unwrap().is_none());
    }

    #[test]
    fn test_non_utf8_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranscriptCache::new(dir.path());
        std::fs::write(dir.path().join(format!("{}.json", VIDEO)), [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        assert!(cache.get(VIDEO).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cached_source_refetches_over_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(format!("{}.json", VIDEO)), [0xff, 0xfe, 0x00, 0x7b]).unwrap();
        let inner = Arc::new(StaticTranscriptSource::new(&[(VIDEO, "some transcript text")]));
        let cache = Arc::new(TranscriptCache::new(dir.path()));
        let source = CachedTranscriptSource::new(inner.clone(), cache.clone());

        let doc = source.fetch(VIDEO).await.unwrap();

        assert_eq!(doc.full_text, "some transcript text");
        assert_eq!(inner.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(VIDEO).unwrap(), Some(doc));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let cache = TranscriptCache::new("/tmp/unused");
        assert!(cache.get("../../secret").is_err());
    }

    #[tokio::test]
    async fn test_cached_source_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(StaticTranscriptSource::new(&[(VIDEO, "some transcript text")]));
        let cache = Arc::new(TranscriptCache::new(dir.path()));
        let source = CachedTranscriptSource::new(inner.clone(), cache.clone());

        let first = source.fetch(VIDEO).await.unwrap();
        let second = source.fetch(VIDEO).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.fetches.load(Ordering::SeqCst), 1);
        assert!(cache.get(VIDEO).unwrap().is_some());
    }

    #[test]
    fn test_cached_source_propagates_errors() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(StaticTranscriptSource::new(&[]));
        let cache = Arc::new(TranscriptCache::new(dir.path()));
        let source = CachedTranscriptSource::new(inner, cache.clone());

        let err = tokio_test::block_on(source.fetch(VIDEO)).unwrap_err();
        assert!(matches!(err, TubeRagError::NoTranscriptFound(_)));
        assert!(!cache.contains(VIDEO));
    }
}
