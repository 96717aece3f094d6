//! YouTube transcript source backed by yt-dlp.
//!
//! yt-dlp resolves the caption tracks of a video; the chosen track is then
//! downloaded in YouTube's `json3` timed-text format.

use super::{TranscriptDocument, TranscriptSegment, TranscriptSource};
use crate::error::{Result, TubeRagError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// A caption track chosen for download.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CaptionTrack {
    language: String,
    url: String,
    auto_generated: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// YouTube transcript source.
pub struct YoutubeTranscriptSource {
    http: reqwest::Client,
    languages: Vec<String>,
}

impl YoutubeTranscriptSource {
    /// Create a source preferring the given caption languages, in order.
    pub fn new(languages: Vec<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let languages = if languages.is_empty() {
            vec!["en".to_string()]
        } else {
            languages
        };

        Ok(Self { http, languages })
    }

    /// Fetch video metadata, including caption track listings, using yt-dlp.
    async fn dump_metadata(&self, video_id: &str) -> Result<Value> {
        let url = watch_url(video_id);

        let result = Command::new("yt-dlp")
            .args(["--dump-json", "--skip-download", "--no-warnings", "--no-playlist", &url])
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TubeRagError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(TubeRagError::TranscriptSource(format!("Failed to run yt-dlp: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TubeRagError::TranscriptUnavailable(format!(
                "{}: {}",
                video_id,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            TubeRagError::TranscriptSource(format!("Failed to parse yt-dlp output: {}", e))
        })
    }

    async fn download_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>> {
        let response = self.http.get(&track.url).send().await?.error_for_status()?;
        let timed_text: TimedText = response.json().await?;
        Ok(segments_from_timed_text(timed_text))
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<TranscriptDocument> {
        info!("Fetching transcript for video {}", video_id);

        let metadata = self.dump_metadata(video_id).await?;
        let track = select_track(&metadata, &self.languages, video_id)?;

        if track.auto_generated {
            warn!("Using auto-generated '{}' transcript", track.language);
        } else {
            info!("Using manually created '{}' transcript", track.language);
        }

        let segments = self.download_track(&track).await?;
        if segments.is_empty() {
            return Err(TubeRagError::NoTranscriptFound(format!(
                "transcript for {} is empty",
                video_id
            )));
        }

        debug!("Fetched {} transcript segments", segments.len());
        Ok(TranscriptDocument::from_segments(video_id, &watch_url(video_id), segments))
    }
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Pick a caption track, preferring manual tracks over auto-generated ones.
fn select_track(metadata: &Value, languages: &[String], video_id: &str) -> Result<CaptionTrack> {
    let manual = metadata.get("subtitles").and_then(Value::as_object);
    let automatic = metadata.get("automatic_captions").and_then(Value::as_object);

    let has_tracks = |tracks: Option<&serde_json::Map<String, Value>>| {
        tracks.is_some_and(|t| !t.is_empty())
    };
    if !has_tracks(manual) && !has_tracks(automatic) {
        return Err(TubeRagError::TranscriptsDisabled(video_id.to_string()));
    }

    for (tracks, auto_generated) in [(manual, false), (automatic, true)] {
        let Some(tracks) = tracks else { continue };

        for language in languages {
            // Regional variants such as `en-US` count as the base language
            let candidate = tracks.get(language.as_str()).map(|v| (language.clone(), v)).or_else(|| {
                tracks
                    .iter()
                    .find(|(key, _)| key.starts_with(&format!("{}-", language)))
                    .map(|(key, v)| (key.clone(), v))
            });

            if let Some((language, formats)) = candidate {
                if let Some(url) = json3_url(formats) {
                    return Ok(CaptionTrack {
                        language,
                        url,
                        auto_generated,
                    });
                }
            }
        }
    }

    Err(TubeRagError::NoTranscriptFound(format!(
        "no {} transcript for {}",
        languages.join("/"),
        video_id
    )))
}

fn json3_url(formats: &Value) -> Option<String> {
    formats
        .as_array()?
        .iter()
        .find(|f| f.get("ext").and_then(Value::as_str) == Some("json3"))
        .and_then(|f| f.get("url").and_then(Value::as_str))
        .map(|s| s.to_string())
}

fn segments_from_timed_text(timed_text: TimedText) -> Vec<TranscriptSegment> {
    timed_text
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                start: event.start_ms as f64 / 1000.0,
                duration: event.duration_ms as f64 / 1000.0,
                text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn en() -> Vec<String> {
        vec!["en".to_string()]
    }

    fn formats(url: &str) -> Value {
        json!([
            {"ext": "vtt", "url": "https://example.test/vtt"},
            {"ext": "json3", "url": url}
        ])
    }

    #[test]
    fn test_prefers_manual_track() {
        let metadata = json!({
            "subtitles": {"en": formats("https://example.test/manual")},
            "automatic_captions": {"en": formats("https://example.test/auto")}
        });

        let track = select_track(&metadata, &en(), "vid").unwrap();
        assert_eq!(track.url, "https://example.test/manual");
        assert!(!track.auto_generated);
    }

    #[test]
    fn test_falls_back_to_auto_generated() {
        let metadata = json!({
            "subtitles": {"de": formats("https://example.test/de")},
            "automatic_captions": {"en-US": formats("https://example.test/auto")}
        });

        let track = select_track(&metadata, &en(), "vid").unwrap();
        assert_eq!(track.url, "https://example.test/auto");
        assert_eq!(track.language, "en-US");
        assert!(track.auto_generated);
    }

    #[test]
    fn test_no_tracks_means_disabled() {
        let metadata = json!({"subtitles": {}, "automatic_captions": {}});
        let err = select_track(&metadata, &en(), "vid").unwrap_err();
        assert!(matches!(err, TubeRagError::TranscriptsDisabled(_)));

        let err = select_track(&json!({}), &en(), "vid").unwrap_err();
        assert!(matches!(err, TubeRagError::TranscriptsDisabled(_)));
    }

    #[test]
    fn test_no_matching_language() {
        let metadata = json!({"subtitles": {"fr": formats("https://example.test/fr")}});
        let err = select_track(&metadata, &en(), "vid").unwrap_err();
        assert!(matches!(err, TubeRagError::NoTranscriptFound(_)));
    }

    #[test]
    fn test_segments_from_timed_text() {
        let timed_text: TimedText = serde_json::from_value(json!({
            "events": [
                {"tStartMs": 0, "dDurationMs": 1500, "segs": [{"utf8": "hello "}, {"utf8": "world"}]},
                {"tStartMs": 1500, "dDurationMs": 10},
                {"tStartMs": 1600, "dDurationMs": 100, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 2000, "dDurationMs": 2500, "segs": [{"utf8": "second\nline"}]}
            ]
        }))
        .unwrap();

        let segments = segments_from_timed_text(timed_text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert_eq!(segments[0].duration, 1.5);
        assert_eq!(segments[1].start, 2.0);
        assert_eq!(segments[1].text, "second line");
    }
}
