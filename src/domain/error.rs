use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a transcription attempt did not produce a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionErrorKind {
    /// The backend refused the job (bad config, encoding mismatch, auth).
    Rejected,
    /// The job reached its failed terminal state.
    JobFailed,
    /// The job did not reach a terminal state before the client deadline.
    Timeout,
    /// The job status could not be read (transport fault, error status, unreadable reply).
    Unavailable,
}

impl fmt::Display for TranscriptionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TranscriptionErrorKind::Rejected => "rejected",
            TranscriptionErrorKind::JobFailed => "job failed",
            TranscriptionErrorKind::Timeout => "timeout",
            TranscriptionErrorKind::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// Domain-level errors for vidsum.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Could not resolve video: {0}")]
    Resolution(String),

    #[error("No format with {channels} audio channel(s) and quality '{quality}' is available")]
    NoFormatAvailable { channels: u32, quality: String },

    #[error("Transfer interrupted: {0}")]
    Transfer(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transcription error ({kind}): {message}")]
    Transcription {
        kind: TranscriptionErrorKind,
        message: String,
    },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Generation backend returned no candidates")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Shorthand for a transcription error of the given kind.
    pub fn transcription(kind: TranscriptionErrorKind, message: impl Into<String>) -> Self {
        DomainError::Transcription {
            kind,
            message: message.into(),
        }
    }

    /// Whether a caller may reasonably retry the whole run after this error.
    ///
    /// The pipeline itself never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Transfer(_)
                | DomainError::Storage(_)
                | DomainError::HttpRequest(_)
                | DomainError::Transcription {
                    kind: TranscriptionErrorKind::Unavailable,
                    ..
                }
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Resolve, select a format, download.
    Fetch,
    /// Transcode to canonical PCM.
    Extract,
    /// Upload the audio to object storage.
    Upload,
    /// Long-running transcription job.
    Transcribe,
    /// Text generation.
    Summarize,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Upload => "upload",
            Stage::Transcribe => "transcribe",
            Stage::Summarize => "summarize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal error of a pipeline run.
///
/// Names exactly one failing stage. Errors hit while releasing resources
/// afterwards are kept in `cleanup_errors` and never replace `source`.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: DomainError,
    pub cleanup_errors: Vec<DomainError>,
}

impl PipelineError {
    pub fn new(stage: Stage, source: DomainError) -> Self {
        Self {
            stage,
            source,
            cleanup_errors: Vec::new(),
        }
    }

    /// Whether the run was stopped by cancellation rather than a stage fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, DomainError::Cancelled)
    }
}
