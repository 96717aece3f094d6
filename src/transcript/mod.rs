//! Transcript sources and caching.
//!
//! A transcript is fetched once per video, stored as a JSON document keyed by
//! the video id, and reused for every later ingestion or summary.

mod cache;
mod video_url;
mod youtube;

pub use cache::{CachedTranscriptSource, TranscriptCache};
pub use video_url::{extract_video_id, is_valid_video_id, validate_url, VideoUrl};
pub use youtube::YoutubeTranscriptSource;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timed caption segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    pub text: String,
}

/// A video's full transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub video_id: String,
    #[serde(rename = "url")]
    pub source_url: String,
    pub full_text: String,
    #[serde(rename = "timestamps")]
    pub segments: Vec<TranscriptSegment>,
    pub total_segments: usize,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl TranscriptDocument {
    /// Build a document from segments; the full text joins segment texts with spaces.
    pub fn from_segments(video_id: &str, source_url: &str, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        Self {
            video_id: video_id.to_string(),
            source_url: source_url.to_string(),
            full_text,
            total_segments: segments.len(),
            segments,
            fetched_at: Utc::now(),
        }
    }
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript of a video by id.
    async fn fetch(&self, video_id: &str) -> Result<TranscriptDocument>;
}


#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            duration: 2.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_from_segments() {
        let doc = TranscriptDocument::from_segments(
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            vec![segment(0.0, "hello there"), segment(2.0, "general kenobi ")],
        );

        assert_eq!(doc.full_text, "hello there general kenobi");
        assert_eq!(doc.total_segments, 2);
    }

    #[test]
    fn test_json_shape() {
        let doc = TranscriptDocument::from_segments("abc", "https://youtu.be/abc", vec![segment(1.5, "x")]);
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["url"], "https://youtu.be/abc");
        assert_eq!(json["timestamps"][0]["start"], 1.5);
        assert_eq!(json["total_segments"], 1);
    }

    #[test]
    fn test_reads_documents_without_fetch_time() {
        let raw = r#"{
            "video_id": "abc",
            "url": "https://youtu.be/abc",
            "full_text": "words",
            "timestamps": [{"start": 0.0, "duration": 1.0, "text": "words"}],
            "total_segments": 1
        }"#;

        let doc: TranscriptDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.full_text, "words");
    }
}
