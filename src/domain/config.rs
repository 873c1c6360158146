use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Run-level pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Video to summarize when none is given on the command line.
    pub video_identifier: Option<String>,
    /// Parent directory for per-run scratch directories.
    pub work_dir: PathBuf,
    /// Transcoder executable.
    pub ffmpeg_path: PathBuf,
    /// Best-effort deletion of the uploaded object and cancellation of the
    /// transcription job when a run fails.
    pub cleanup_remote_on_failure: bool,
    /// Delete the uploaded object after a successful run.
    pub delete_remote_on_success: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_identifier: None,
            work_dir: std::env::temp_dir().join("vidsum"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            cleanup_remote_on_failure: true,
            delete_remote_on_success: false,
        }
    }
}

/// Video host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Base URL of the video host.
    pub api_base: String,
    /// Player client name sent with resolve requests.
    pub client_name: String,
    /// Player client version sent with resolve requests.
    pub client_version: String,
    /// Required audio channel count of the chosen stream.
    pub channels: u32,
    /// Required quality tier of the chosen stream.
    pub quality: String,
    /// Timeout for the resolve request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.youtube.com".to_string(),
            client_name: "ANDROID".to_string(),
            client_version: "19.09.37".to_string(),
            channels: 2,
            quality: "tiny".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket_name: String,
    /// Key template. Supports `{run_id}`, `{video_id}` and `{sha256}`.
    pub object_key_template: String,
    pub api_base: String,
    /// Environment variable holding an OAuth access token.
    pub access_token_env: String,
    /// File holding an access token, used when the environment variable is unset.
    pub credentials_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_name: "yt_summary".to_string(),
            object_key_template: "{run_id}/audio.wav".to_string(),
            api_base: "https://storage.googleapis.com".to_string(),
            access_token_env: "GOOGLE_OAUTH_ACCESS_TOKEN".to_string(),
            credentials_path: dirs::home_dir().map(|h| h.join(".google").join("access_token")),
        }
    }
}

impl StorageConfig {
    /// Render the object key for one run.
    pub fn render_key(&self, run_id: &str, video_id: &str, sha256: &str) -> String {
        self.object_key_template
            .replace("{run_id}", run_id)
            .replace("{video_id}", video_id)
            .replace("{sha256}", sha256)
    }
}

/// Transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// BCP-47 language tag (e.g., "en-US").
    pub language_code: String,
    /// Sample rate of the extracted audio and of the recognition request.
    pub sample_rate_hz: u32,
    pub api_base: String,
    /// Delay between job status polls.
    pub poll_interval_ms: u64,
    /// Client-side deadline for the job to reach a terminal state.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language_code: "en-US".to_string(),
            sample_rate_hz: 16_000,
            api_base: "https://speech.googleapis.com".to_string(),
            poll_interval_ms: 5_000,
            timeout_secs: 3_600,
        }
    }
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            max_files: 7,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub fetcher: FetcherConfig,
    pub storage: StorageConfig,
    pub transcription: TranscriptionConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.transcription.sample_rate_hz == 0 {
            return Err(DomainError::Config("sample_rate_hz must be positive".to_string()));
        }
        if self.transcription.poll_interval_ms == 0 {
            return Err(DomainError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.transcription.timeout_secs == 0 {
            return Err(DomainError::Config("timeout_secs must be positive".to_string()));
        }
        if self.storage.bucket_name.trim().is_empty() {
            return Err(DomainError::Config("bucket_name is empty".to_string()));
        }
        if self.storage.render_key("r", "v", "s").trim().is_empty() {
            return Err(DomainError::Config("object_key_template renders an empty key".to_string()));
        }
        if self.fetcher.channels == 0 {
            return Err(DomainError::Config("fetcher.channels must be positive".to_string()));
        }
        Ok(())
    }
}
