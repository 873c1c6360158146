use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::app::{
    cancellable, AudioExtractor, MediaFetcher, RemoteStager, Summarizer, TranscriptionCoordinator,
};
use crate::domain::media::sanitize_file_name;
use crate::domain::{
    AppConfig, AudioFormat, DomainError, FormatConstraints, LocalMediaFile, PipelineError,
    RecognitionConfig, RemoteObjectRef, RunId, Stage, Summary, Transcript, TranscriptionJob,
};
use crate::ports::{ObjectStore, SpeechBackend, TextGenerator, Transcoder, VideoSource};

const AUDIO_FILE_NAME: &str = "audio.wav";

/// External collaborators a pipeline is wired with.
pub struct PipelinePorts {
    pub video_source: Arc<dyn VideoSource>,
    pub transcoder: Arc<dyn Transcoder>,
    pub object_store: Arc<dyn ObjectStore>,
    pub speech: Arc<dyn SpeechBackend>,
    pub generator: Arc<dyn TextGenerator>,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub video_id: String,
    pub title: String,
    pub transcript: Transcript,
    pub summary: Summary,
    /// Staged audio, `None` when it was deleted after the run.
    pub remote_object: Option<RemoteObjectRef>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

fn at(stage: Stage) -> impl FnOnce(DomainError) -> PipelineError {
    move |source| PipelineError::new(stage, source)
}

/// Everything a run has acquired so far and must give back.
#[derive(Default)]
struct RunResources {
    workspace: Option<TempDir>,
    media: Option<LocalMediaFile>,
    audio: Option<LocalMediaFile>,
    remote: Option<RemoteObjectRef>,
    job: Option<TranscriptionJob>,
}

impl RunResources {
    fn release_local(&mut self) -> Vec<DomainError> {
        let mut errors = Vec::new();
        for file in [self.audio.as_mut(), self.media.as_mut()].into_iter().flatten() {
            if let Err(e) = file.delete() {
                errors.push(e);
            }
        }
        if let Some(workspace) = self.workspace.take() {
            let path = workspace.path().to_path_buf();
            if let Err(e) = workspace.close() {
                errors.push(DomainError::Io(format!(
                    "failed to remove {}: {}",
                    path.display(),
                    e
                )));
            }
        }
        errors
    }
}

struct Completed {
    video_id: String,
    title: String,
    transcript: Transcript,
    summary: Summary,
    object: RemoteObjectRef,
}

/// Runs fetch, extract, upload, transcribe and summarize strictly in order.
///
/// Local files live in a per-run directory under `work_dir` and are removed on
/// every exit path. Remote cleanup is best effort and governed by config.
pub struct Pipeline {
    fetcher: MediaFetcher,
    extractor: AudioExtractor,
    stager: RemoteStager,
    coordinator: TranscriptionCoordinator,
    summarizer: Summarizer,
    work_dir: PathBuf,
    cleanup_remote_on_failure: bool,
    delete_remote_on_success: bool,
}

impl Pipeline {
    pub fn new(ports: PipelinePorts, config: &AppConfig) -> Self {
        let transcription = &config.transcription;
        let constraints = FormatConstraints {
            channels: config.fetcher.channels,
            quality: config.fetcher.quality.clone(),
        };

        Self {
            fetcher: MediaFetcher::new(ports.video_source, constraints),
            extractor: AudioExtractor::new(
                ports.transcoder,
                AudioFormat::canonical(transcription.sample_rate_hz),
            ),
            stager: RemoteStager::new(ports.object_store, config.storage.clone()),
            coordinator: TranscriptionCoordinator::new(
                ports.speech,
                RecognitionConfig::new(transcription.sample_rate_hz, transcription.language_code.clone()),
                Duration::from_millis(transcription.poll_interval_ms),
                Duration::from_secs(transcription.timeout_secs),
            ),
            summarizer: Summarizer::new(ports.generator),
            work_dir: config.pipeline.work_dir.clone(),
            cleanup_remote_on_failure: config.pipeline.cleanup_remote_on_failure,
            delete_remote_on_success: config.pipeline.delete_remote_on_success,
        }
    }

    /// Summarize the video behind `identifier`.
    ///
    /// Cancelling `cancel` fails the current stage with `DomainError::Cancelled`
    /// and releases resources exactly as any other failure does.
    pub async fn run(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let run_id = RunId::generate();
        let span = info_span!("pipeline", run_id = %run_id);
        self.run_with_id(run_id, identifier, cancel).instrument(span).await
    }

    async fn run_with_id(
        &self,
        run_id: RunId,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();
        info!(identifier = %identifier, "Pipeline started");

        let mut resources = RunResources::default();
        let result = self.execute(&run_id, identifier, cancel, &mut resources).await;
        let mut cleanup_errors = resources.release_local();

        match result {
            Ok(done) => {
                for e in &cleanup_errors {
                    warn!(error = %e, "Local cleanup failed");
                }
                let mut remote_object = Some(done.object);
                if self.delete_remote_on_success {
                    if let Some(object) = remote_object.take() {
                        if let Err(e) = self.stager.remove(&object).await {
                            warn!(object = %object, error = %e, "Could not delete staged audio");
                            remote_object = Some(object);
                        }
                    }
                }

                let elapsed = started.elapsed();
                info!(elapsed_ms = elapsed.as_millis() as u64, "Pipeline finished");
                Ok(PipelineOutcome {
                    run_id: run_id.to_string(),
                    video_id: done.video_id,
                    title: done.title,
                    transcript: done.transcript,
                    summary: done.summary,
                    remote_object,
                    elapsed,
                })
            }
            Err(mut err) => {
                if self.cleanup_remote_on_failure {
                    cleanup_errors.extend(self.release_remote(&mut resources).await);
                } else if resources.remote.is_some() || resources.job.is_some() {
                    warn!("Leaving remote object and job in place");
                }
                for e in &cleanup_errors {
                    warn!(error = %e, "Cleanup after failure failed");
                }
                err.cleanup_errors = cleanup_errors;
                error!(stage = %err.stage, error = %err.source, "Pipeline failed");
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        run_id: &RunId,
        identifier: &str,
        cancel: &CancellationToken,
        resources: &mut RunResources,
    ) -> Result<Completed, PipelineError> {
        // Fetch
        let video = cancellable(cancel, self.fetcher.resolve(identifier))
            .await
            .map_err(at(Stage::Fetch))?;
        info!(video_id = %video.video_id, title = %video.title, formats = video.formats.len(), "Video resolved");
        let format = self.fetcher.select_format(&video).map_err(at(Stage::Fetch))?;

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| DomainError::Io(format!("cannot create {}: {}", self.work_dir.display(), e)))
            .map_err(at(Stage::Fetch))?;
        let workspace = tempfile::Builder::new()
            .prefix(&format!("run-{}-", run_id))
            .tempdir_in(&self.work_dir)
            .map_err(DomainError::from)
            .map_err(at(Stage::Fetch))?;
        let dir = resources.workspace.insert(workspace).path().to_path_buf();

        let media_name = format!("{}.{}", sanitize_file_name(&video.title), format.extension());
        let media = resources.media.insert(LocalMediaFile::reserve(dir.join(media_name)));
        self.fetcher
            .download(&video, &format, media, cancel)
            .await
            .map_err(at(Stage::Fetch))?;

        // Extract
        let audio = resources.audio.insert(LocalMediaFile::reserve(dir.join(AUDIO_FILE_NAME)));
        let artifact = cancellable(cancel, self.extractor.extract(media, audio))
            .await
            .map_err(at(Stage::Extract))?;
        info!(bytes = artifact.byte_len, sample_rate = artifact.format.sample_rate_hz, "Audio extracted");

        // Upload
        let prepared = self
            .stager
            .prepare(&artifact, run_id, &video.video_id)
            .await
            .map_err(at(Stage::Upload))?;
        resources.remote = Some(prepared.object.clone());
        let object = cancellable(cancel, self.stager.upload(prepared))
            .await
            .map_err(at(Stage::Upload))?;

        // Transcribe
        let job = cancellable(cancel, self.coordinator.submit(&object, &artifact.format))
            .await
            .map_err(at(Stage::Transcribe))?;
        let job = resources.job.insert(job);
        let transcript = self
            .coordinator
            .wait(job, cancel)
            .await
            .map_err(at(Stage::Transcribe))?;

        // Summarize
        let summary = cancellable(cancel, self.summarizer.summarize(&video.title, &transcript))
            .await
            .map_err(at(Stage::Summarize))?;
        info!(chars = summary.text.len(), "Summary generated");

        Ok(Completed {
            video_id: video.video_id,
            title: video.title,
            transcript,
            summary,
            object,
        })
    }

    /// Cancel an unfinished job, then delete the staged object.
    async fn release_remote(&self, resources: &mut RunResources) -> Vec<DomainError> {
        let mut errors = Vec::new();
        if let Some(job) = resources.job.take() {
            if !job.state.is_terminal() {
                info!(job = %job.name, "Cancelling transcription job");
                if let Err(e) = self.coordinator.cancel(&job).await {
                    errors.push(e);
                }
            }
        }
        if let Some(object) = resources.remote.take() {
            if let Err(e) = self.stager.remove(&object).await {
                errors.push(e);
            }
        }
        errors
    }
}
