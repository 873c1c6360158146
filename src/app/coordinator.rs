use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    AudioFormat, DomainError, JobState, JobStatus, RecognitionConfig, RemoteObjectRef, Transcript,
    TranscriptionErrorKind, TranscriptionJob,
};
use crate::ports::SpeechBackend;

/// Keep backend faults inside the transcription error taxonomy.
fn backend_fault(kind: TranscriptionErrorKind) -> impl FnOnce(DomainError) -> DomainError {
    move |e| match e {
        DomainError::Transcription { .. } | DomainError::Cancelled => e,
        other => DomainError::transcription(kind, other.to_string()),
    }
}

/// Drives one long-running transcription job from submission to a transcript.
pub struct TranscriptionCoordinator {
    backend: Arc<dyn SpeechBackend>,
    config: RecognitionConfig,
    poll_interval: Duration,
    timeout: Duration,
}

impl TranscriptionCoordinator {
    pub fn new(
        backend: Arc<dyn SpeechBackend>,
        config: RecognitionConfig,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            config,
            poll_interval,
            timeout,
        }
    }

    /// Start a job for a fully written object.
    ///
    /// Refuses to submit when the request would declare a different encoding
    /// than the audio actually has.
    pub async fn submit(
        &self,
        object: &RemoteObjectRef,
        audio: &AudioFormat,
    ) -> Result<TranscriptionJob, DomainError> {
        self.config.ensure_matches(audio)?;
        info!(
            uri = %object.uri(),
            language = %self.config.language_code,
            sample_rate = self.config.sample_rate_hertz,
            "Submitting transcription job"
        );
        self.backend
            .submit(object, &self.config)
            .await
            .map_err(backend_fault(TranscriptionErrorKind::Rejected))
    }

    /// Poll until the job is terminal, the deadline passes, or `cancel` fires.
    ///
    /// Polls once immediately, then every `poll_interval`. On timeout the job is
    /// left running on the backend; use [`cancel`](Self::cancel) to stop it.
    pub async fn wait(
        &self,
        job: &mut TranscriptionJob,
        cancel: &CancellationToken,
    ) -> Result<Transcript, DomainError> {
        let name = job.name.clone();
        match tokio::time::timeout(self.timeout, self.poll_until_terminal(job, cancel)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(job = %name, timeout_secs = self.timeout.as_secs(), "Transcription timed out");
                Err(DomainError::transcription(
                    TranscriptionErrorKind::Timeout,
                    format!("job {} not finished after {:?}", name, self.timeout),
                ))
            }
        }
    }

    async fn poll_until_terminal(
        &self,
        job: &mut TranscriptionJob,
        cancel: &CancellationToken,
    ) -> Result<Transcript, DomainError> {
        let mut polls: u32 = 0;
        loop {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DomainError::Cancelled),
                status = self.backend.poll(job) => {
                    status.map_err(backend_fault(TranscriptionErrorKind::Unavailable))?
                }
            };
            polls += 1;

            match status {
                JobStatus::Running => {
                    job.state = JobState::Running;
                    debug!(job = %job.name, polls = polls, "Job running");
                }
                JobStatus::Succeeded(segments) => {
                    job.state = JobState::Succeeded;
                    let transcript = Transcript::flatten(&segments, &self.config.language_code);
                    if transcript.is_empty() {
                        warn!(job = %job.name, "Transcription finished without speech");
                    }
                    info!(
                        job = %job.name,
                        segments = segments.len(),
                        chars = transcript.text.len(),
                        "Transcription complete"
                    );
                    return Ok(transcript);
                }
                JobStatus::Failed(cause) => {
                    job.state = JobState::Failed;
                    return Err(DomainError::transcription(TranscriptionErrorKind::JobFailed, cause));
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DomainError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Best-effort stop of a job that has not reached a terminal state.
    pub async fn cancel(&self, job: &TranscriptionJob) -> Result<(), DomainError> {
        if job.state.is_terminal() {
            return Ok(());
        }
        self.backend
            .cancel(job)
            .await
            .map_err(backend_fault(TranscriptionErrorKind::Unavailable))
    }
}
