pub mod config;
pub mod error;
pub mod media;
pub mod secret;
pub mod summary;
pub mod transcription;
pub mod video;

pub use config::AppConfig;
pub use error::{DomainError, PipelineError, Stage, TranscriptionErrorKind};
pub use media::{AudioArtifact, AudioEncoding, AudioFormat, FileState, LocalMediaFile, RunId};
pub use secret::SecretString;
pub use summary::{Summary, SummaryRequest};
pub use transcription::{
    Alternative, JobState, JobStatus, RecognitionConfig, RemoteObjectRef, ResultSegment,
    Transcript, TranscriptionJob,
};
pub use video::{FormatConstraints, FormatDescriptor, VideoRef};
