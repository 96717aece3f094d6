//! YouTube URL parsing and validation.

use crate::error::{Result, TubeRagError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
    "www.youtu.be",
];

static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})",
        r"youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
        r"^([a-zA-Z0-9_-]{11})$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid video id pattern"))
    .collect()
});

/// A validated YouTube video URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUrl {
    pub video_id: String,
    pub original_url: String,
    pub clean_url: String,
    pub embed_url: String,
    pub thumbnail_url: String,
    pub is_shorts: bool,
    pub playlist_id: Option<String>,
}

/// Extract an 11-character video id from a YouTube URL or a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether `id` has the shape of a YouTube video id.
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validate a YouTube URL and derive its canonical forms.
///
/// A bare video id is expanded to its watch URL and a missing scheme is
/// filled in with `https://`. The host must be a YouTube domain and the URL
/// must carry a video id.
pub fn validate_url(input: &str) -> Result<VideoUrl> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TubeRagError::InvalidUrl("URL is empty".to_string()));
    }

    let with_scheme = if is_valid_video_id(trimmed) {
        format!("https://www.youtube.com/watch?v={}", trimmed)
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|e| TubeRagError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return Err(TubeRagError::InvalidUrl(format!(
            "{} is not a YouTube URL",
            trimmed
        )));
    }

    let video_id = extract_video_id(&with_scheme)
        .ok_or_else(|| TubeRagError::InvalidUrl(format!("No video id in {}", trimmed)))?;

    let playlist_id = parsed
        .query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.into_owned());

    Ok(VideoUrl {
        clean_url: format!("https://www.youtube.com/watch?v={}", video_id),
        embed_url: format!("https://www.youtube.com/embed/{}", video_id),
        thumbnail_url: format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id),
        is_shorts: with_scheme.to_lowercase().contains("/shorts/"),
        original_url: with_scheme,
        playlist_id,
        video_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ];
        for case in cases {
            assert_eq!(
                extract_video_id(case),
                Some("dQw4w9WgXcQ".to_string()),
                "failed for {}",
                case
            );
        }

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?list=PL123"), None);
    }

    #[test]
    fn test_validate_url() {
        let url = validate_url("  youtube.com/watch?v=dQw4w9WgXcQ&list=PLabc ").unwrap();

        assert_eq!(url.video_id, "dQw4w9WgXcQ");
        assert_eq!(url.original_url, "https://youtube.com/watch?v=dQw4w9WgXcQ&list=PLabc");
        assert_eq!(url.clean_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(url.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(
            url.thumbnail_url,
            "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
        assert_eq!(url.playlist_id.as_deref(), Some("PLabc"));
        assert!(!url.is_shorts);
    }

    #[test]
    fn test_validate_shorts_url() {
        let url = validate_url("https://m.youtube.com/shorts/abcdefghijk").unwrap();
        assert_eq!(url.video_id, "abcdefghijk");
        assert!(url.is_shorts);
        assert_eq!(url.playlist_id, None);
    }

    #[test]
    fn test_validate_bare_video_id() {
        let url = validate_url(" dQw4w9WgXcQ ").unwrap();
        assert_eq!(url.video_id, "dQw4w9WgXcQ");
        assert_eq!(url.original_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(url.clean_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(!url.is_shorts);
    }

    #[test]
    fn test_validate_rejects_other_hosts() {
        let err = validate_url("https://vimeo.com/watch?v=dQw4w9WgXcQ").unwrap_err();
        assert!(matches!(err, TubeRagError::InvalidUrl(_)));

        assert!(validate_url("").is_err());
        assert!(validate_url("https://www.youtube.com/feed/trending").is_err());
    }

    #[test]
    fn test_is_valid_video_id() {
        assert!(is_valid_video_id("dQw4w9WgXcQ"));
        assert!(is_valid_video_id("a_b-c_d-e_f"));
        assert!(!is_valid_video_id("short"));
        assert!(!is_valid_video_id("../../etc/x"));
    }
}
