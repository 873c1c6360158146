use async_trait::async_trait;

use crate::domain::{DomainError, JobStatus, RecognitionConfig, RemoteObjectRef, TranscriptionJob};

/// Port for the long-running speech transcription service.
///
/// Jobs are owned by the backend; the client only holds their handles.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Start a job that transcribes the given stored object.
    async fn submit(
        &self,
        audio: &RemoteObjectRef,
        config: &RecognitionConfig,
    ) -> Result<TranscriptionJob, DomainError>;

    /// Fetch the current status of a job once.
    async fn poll(&self, job: &TranscriptionJob) -> Result<JobStatus, DomainError>;

    /// Ask the backend to stop a job. Best effort.
    async fn cancel(&self, job: &TranscriptionJob) -> Result<(), DomainError>;
}
