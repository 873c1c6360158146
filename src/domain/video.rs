use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::DomainError;

const VIDEO_ID_LEN: usize = 11;

/// One encoded stream offered by the video host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Host-assigned stream identifier.
    pub itag: u32,
    /// Full MIME type, e.g. `audio/mp4; codecs="mp4a.40.2"`.
    pub mime_type: String,
    /// Codec list parsed from the MIME type.
    pub codec: String,
    /// Number of audio channels (0 for video-only streams).
    pub audio_channels: u32,
    /// Quality tier label, e.g. "tiny", "medium", "hd720".
    pub quality: String,
    pub bitrate: u64,
    /// Byte length when the host reports it.
    pub content_length: Option<u64>,
    /// Direct stream URL.
    pub url: String,
}

impl FormatDescriptor {
    /// Container extension implied by the MIME type.
    pub fn extension(&self) -> &'static str {
        if self.mime_type.starts_with("video/webm") || self.mime_type.starts_with("audio/webm") {
            "webm"
        } else if self.mime_type.starts_with("audio/mp4") {
            "m4a"
        } else {
            "mp4"
        }
    }
}

/// Extract the codec list from a MIME type such as `video/mp4; codecs="avc1, mp4a"`.
pub fn codec_from_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("codecs="))
        .map(|codecs| codecs.trim_matches('"').to_string())
        .unwrap_or_default()
}

/// Stream filter applied by format selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConstraints {
    pub channels: u32,
    pub quality: String,
}

impl Default for FormatConstraints {
    fn default() -> Self {
        Self {
            channels: 2,
            quality: "tiny".to_string(),
        }
    }
}

/// A resolved video. Immutable once resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRef {
    /// Identifier as given by the caller.
    pub identifier: String,
    /// Canonical host id parsed from the identifier.
    pub video_id: String,
    pub title: String,
    /// All streams offered for this video.
    pub formats: Vec<FormatDescriptor>,
}

/// Pick the stream to download.
///
/// Keeps formats with exactly `constraints.channels` channels and the requested
/// quality tier, then picks the lowest bitrate (ties broken by lowest itag) so the
/// same input always yields the same descriptor.
pub fn select_format(
    video: &VideoRef,
    constraints: &FormatConstraints,
) -> Result<FormatDescriptor, DomainError> {
    video
        .formats
        .iter()
        .filter(|f| f.audio_channels == constraints.channels)
        .filter(|f| f.quality.eq_ignore_ascii_case(&constraints.quality))
        .min_by_key(|f| (f.bitrate, f.itag))
        .cloned()
        .ok_or_else(|| DomainError::NoFormatAvailable {
            channels: constraints.channels,
            quality: constraints.quality.clone(),
        })
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse the host video id out of a URL or a bare id.
pub fn parse_video_id(identifier: &str) -> Result<String, DomainError> {
    let identifier = identifier.trim();
    if is_video_id(identifier) {
        return Ok(identifier.to_string());
    }

    let parsed = Url::parse(identifier)
        .map_err(|e| DomainError::Resolution(format!("invalid video URL '{}': {}", identifier, e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(DomainError::Resolution(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }
    let host = parsed.host_str().unwrap_or_default();

    let candidate = if host == "youtu.be" {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string)
    } else if let Some((_, v)) = parsed.query_pairs().find(|(key, _)| key == "v") {
        Some(v.into_owned())
    } else {
        let segments: Vec<&str> = parsed.path_segments().map(|s| s.collect()).unwrap_or_default();
        segments
            .windows(2)
            .find(|pair| matches!(pair[0], "shorts" | "embed" | "live" | "v"))
            .map(|pair| pair[1].to_string())
    };

    candidate
        .filter(|id| is_video_id(id))
        .ok_or_else(|| DomainError::Resolution(format!("no video id in '{}'", identifier)))
}
