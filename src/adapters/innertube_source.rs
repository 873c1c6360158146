use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::domain::config::FetcherConfig;
use crate::domain::video::{codec_from_mime, parse_video_id};
use crate::domain::{DomainError, FormatDescriptor, VideoRef};
use crate::ports::{ByteStream, HttpClient, VideoSource};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    video_details: Option<VideoDetails>,
    #[serde(default)]
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoDetails {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<RawFormat>,
    #[serde(default)]
    adaptive_formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormat {
    itag: u32,
    /// Absent for streams that need signature deciphering.
    #[serde(default)]
    url: Option<String>,
    mime_type: String,
    #[serde(default)]
    bitrate: u64,
    #[serde(default)]
    content_length: Option<String>,
    #[serde(default)]
    quality: String,
    #[serde(default)]
    audio_channels: Option<u32>,
}

impl RawFormat {
    fn into_descriptor(self) -> Option<FormatDescriptor> {
        let url = self.url?;
        Some(FormatDescriptor {
            itag: self.itag,
            codec: codec_from_mime(&self.mime_type),
            mime_type: self.mime_type,
            audio_channels: self.audio_channels.unwrap_or(0),
            quality: self.quality,
            bitrate: self.bitrate,
            content_length: self.content_length.and_then(|s| s.parse().ok()),
            url,
        })
    }
}

/// Video host client speaking the player JSON API.
pub struct InnertubeVideoSource {
    http: Arc<dyn HttpClient>,
    config: FetcherConfig,
}

impl InnertubeVideoSource {
    pub fn new(http: Arc<dyn HttpClient>, config: FetcherConfig) -> Self {
        Self { http, config }
    }

    fn player_url(&self) -> String {
        format!("{}/youtubei/v1/player", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl VideoSource for InnertubeVideoSource {
    async fn resolve(&self, identifier: &str) -> Result<VideoRef, DomainError> {
        let video_id = parse_video_id(identifier)?;
        debug!(video_id = %video_id, "Resolving video");

        let body = json!({
            "videoId": video_id,
            "context": {
                "client": {
                    "clientName": self.config.client_name,
                    "clientVersion": self.config.client_version,
                    "hl": "en",
                }
            }
        });
        let value = self
            .http
            .post_json(&self.player_url(), None, &body)
            .await
            .map_err(|e| DomainError::Resolution(e.to_string()))?;
        let player: PlayerResponse = serde_json::from_value(value)
            .map_err(|e| DomainError::Resolution(format!("unexpected player response: {}", e)))?;

        if let Some(status) = &player.playability_status {
            if status.status != "OK" {
                return Err(DomainError::Resolution(format!(
                    "video {} is not playable ({}): {}",
                    video_id,
                    status.status,
                    status.reason.as_deref().unwrap_or("no reason given")
                )));
            }
        }

        let title = player
            .video_details
            .map(|d| d.title)
            .ok_or_else(|| DomainError::Resolution(format!("no details for video {}", video_id)))?;

        let streaming = player.streaming_data.unwrap_or_default();
        let formats: Vec<FormatDescriptor> = streaming
            .formats
            .into_iter()
            .chain(streaming.adaptive_formats)
            .filter_map(RawFormat::into_descriptor)
            .collect();

        debug!(video_id = %video_id, formats = formats.len(), "Player response parsed");

        Ok(VideoRef {
            identifier: identifier.to_string(),
            video_id,
            title,
            formats,
        })
    }

    async fn open_stream(
        &self,
        video: &VideoRef,
        format: &FormatDescriptor,
    ) -> Result<(Option<u64>, ByteStream), DomainError> {
        debug!(video_id = %video.video_id, itag = format.itag, "Opening stream");
        let (length, stream) = self
            .http
            .get_stream(&format.url)
            .await
            .map_err(|e| match e {
                DomainError::Transfer(_) => e,
                other => DomainError::Transfer(other.to_string()),
            })?;
        Ok((length.or(format.content_length), stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ReqwestHttpClient;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn source(api_base: String) -> InnertubeVideoSource {
        let http = Arc::new(ReqwestHttpClient::new(Duration::from_secs(5)).unwrap());
        let config = FetcherConfig {
            api_base,
            ..FetcherConfig::default()
        };
        InnertubeVideoSource::new(http, config)
    }

    #[tokio::test]
    async fn test_resolve_parses_title_and_formats() {
        let mut server = Server::new_async().await;
        let body = json!({
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {"videoId": "GnTKxPQfHRM", "title": "Demo"},
            "streamingData": {
                "formats": [{
                    "itag": 18,
                    "url": "https://cdn.example/18",
                    "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                    "bitrate": 500000,
                    "quality": "medium",
                    "audioChannels": 2
                }],
                "adaptiveFormats": [
                    {
                        "itag": 140,
                        "url": "https://cdn.example/140",
                        "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                        "bitrate": 130000,
                        "contentLength": "1024",
                        "quality": "tiny",
                        "audioChannels": 2
                    },
                    {
                        "itag": 251,
                        "signatureCipher": "s=abc&url=https://cdn.example/251",
                        "mimeType": "audio/webm; codecs=\"opus\"",
                        "quality": "tiny",
                        "audioChannels": 2
                    }
                ]
            }
        });
        let _m = server
            .mock("POST", "/youtubei/v1/player")
            .match_body(Matcher::PartialJson(json!({"videoId": "GnTKxPQfHRM"})))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let video = source(server.url())
            .resolve("https://www.youtube.com/watch?v=GnTKxPQfHRM")
            .await
            .unwrap();
        assert_eq!(video.title, "Demo");
        assert_eq!(video.video_id, "GnTKxPQfHRM");
        assert_eq!(video.formats.len(), 2);
        let audio = video.formats.iter().find(|f| f.itag == 140).unwrap();
        assert_eq!(audio.content_length, Some(1024));
        assert_eq!(audio.codec, "mp4a.40.2");
        assert_eq!(audio.audio_channels, 2);
    }

    #[tokio::test]
    async fn test_unplayable_video_is_resolution_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/youtubei/v1/player")
            .with_status(200)
            .with_body(r#"{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}}"#)
            .create_async()
            .await;

        let err = source(server.url()).resolve("GnTKxPQfHRM").await.unwrap_err();
        assert!(matches!(err, DomainError::Resolution(ref m) if m.contains("Video unavailable")));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_resolution_error() {
        let err = source("http://127.0.0.1:9".to_string())
            .resolve("GnTKxPQfHRM")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_bad_identifier_makes_no_request() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/youtubei/v1/player")
            .expect(0)
            .create_async()
            .await;

        let err = source(server.url()).resolve("nope").await.unwrap_err();
        assert!(matches!(err, DomainError::Resolution(_)));
        m.assert_async().await;
    }
}
