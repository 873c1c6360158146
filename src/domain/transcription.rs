use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::media::{AudioEncoding, AudioFormat};
use crate::domain::{DomainError, TranscriptionErrorKind};

/// URI scheme of the object store the transcription backend reads from.
pub const OBJECT_URI_SCHEME: &str = "gs";

/// A durable object in remote storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectRef {
    pub bucket: String,
    pub key: String,
}

impl RemoteObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `scheme://bucket/key`.
    pub fn uri(&self) -> String {
        format!("{}://{}/{}", OBJECT_URI_SCHEME, self.bucket, self.key)
    }
}

impl fmt::Display for RemoteObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Recognition parameters sent with a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub language_code: String,
}

impl RecognitionConfig {
    pub fn new(sample_rate_hertz: u32, language_code: impl Into<String>) -> Self {
        Self {
            encoding: AudioEncoding::Linear16,
            sample_rate_hertz,
            language_code: language_code.into(),
        }
    }

    /// The backend rejects jobs whose declared encoding differs from the audio,
    /// so refuse them before submitting.
    pub fn ensure_matches(&self, format: &AudioFormat) -> Result<(), DomainError> {
        if self.encoding != format.encoding
            || self.sample_rate_hertz != format.sample_rate_hz
            || format.channels != 1
            || format.bits_per_sample != 16
        {
            return Err(DomainError::transcription(
                TranscriptionErrorKind::Rejected,
                format!(
                    "request declares {} @ {} Hz but audio is {} @ {} Hz, {} ch, {} bit",
                    self.encoding,
                    self.sample_rate_hertz,
                    format.encoding,
                    format.sample_rate_hz,
                    format.channels,
                    format.bits_per_sample
                ),
            ));
        }
        Ok(())
    }
}

/// Client-side view of a transcription job.
///
/// State transitions:
/// - Submitted -> Running (first non-terminal poll)
/// - Submitted | Running -> Succeeded | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Submitted,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Handle of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionJob {
    /// Opaque backend operation name.
    pub name: String,
    pub state: JobState,
}

impl TranscriptionJob {
    pub fn submitted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: JobState::Submitted,
        }
    }
}

/// One ranked hypothesis for a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

/// A consecutive piece of recognized audio. Alternatives are ordered best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSegment {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl ResultSegment {
    /// Rank-0 alternative, if any.
    pub fn top(&self) -> Option<&Alternative> {
        self.alternatives.first()
    }
}

/// Result of polling a job once.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Running,
    Succeeded(Vec<ResultSegment>),
    Failed(String),
}

/// Flattened transcription result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language_code: String,
}

impl Transcript {
    /// Join the top alternative of every segment, in arrival order, with no separator.
    ///
    /// The language tag is taken from the first segment that reports one.
    pub fn flatten(segments: &[ResultSegment], fallback_language: &str) -> Self {
        let text = segments
            .iter()
            .filter_map(ResultSegment::top)
            .map(|alt| alt.transcript.as_str())
            .collect::<String>();
        let language_code = segments
            .iter()
            .find_map(|s| s.language_code.clone())
            .unwrap_or_else(|| fallback_language.to_string());
        Self {
            text,
            language_code,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
