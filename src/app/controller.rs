use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{
    load_token, CloudSpeechBackend, FfmpegTranscoder, GcsObjectStore, InnertubeVideoSource,
    OpenAiTextGenerator, ReqwestHttpClient, TomlConfigStore,
};
use crate::app::{Pipeline, PipelinePorts};
use crate::domain::{AppConfig, DomainError};
use crate::infrastructure::init_logging;
use crate::ports::{ConfigStore, HttpClient};

/// Application controller: loads configuration, owns logging, and wires pipelines.
pub struct AppController {
    config: RwLock<AppConfig>,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Load configuration from `config_path`, or from the OS config directory
    /// when none is given, then initialize logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, DomainError> {
        Self::with_store(TomlConfigStore::new()?, config_path)
    }

    pub fn with_store(store: TomlConfigStore, config_path: Option<&Path>) -> Result<Self, DomainError> {
        let config = match config_path {
            Some(path) => store.load_from(path)?,
            None => store.load()?,
        };

        let log_guard = init_logging(&store.logs_dir(), &config.logging)?;

        info!(
            bucket = %config.storage.bucket_name,
            language = %config.transcription.language_code,
            "AppController initialized"
        );

        Ok(Self {
            config: RwLock::new(config),
            _log_guard: log_guard,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Adjust the in-memory configuration for this process only.
    pub fn apply_overrides<F>(&self, apply: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.config();
        apply(&mut candidate);
        candidate.validate()?;
        *self.config.write() = candidate;
        Ok(())
    }

    /// Read credentials and build a pipeline against the real services.
    pub fn build_pipeline(&self) -> Result<Pipeline, DomainError> {
        let config = self.config();

        let storage_token = load_token(
            &config.storage.access_token_env,
            config.storage.credentials_path.as_deref(),
        )?;
        let api_key = load_token(&config.generation.api_key_env, None)?;

        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(Duration::from_secs(
            config.fetcher.request_timeout_secs,
        ))?);
        let generation_http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(
            Duration::from_secs(config.generation.request_timeout_secs),
        )?);

        let ports = PipelinePorts {
            video_source: Arc::new(InnertubeVideoSource::new(http.clone(), config.fetcher.clone())),
            transcoder: Arc::new(FfmpegTranscoder::new(config.pipeline.ffmpeg_path.clone())),
            object_store: Arc::new(GcsObjectStore::new(
                http.clone(),
                config.storage.api_base.clone(),
                storage_token.clone(),
            )),
            speech: Arc::new(CloudSpeechBackend::new(
                http,
                config.transcription.api_base.clone(),
                storage_token,
            )),
            generator: Arc::new(OpenAiTextGenerator::new(
                generation_http,
                config.generation.api_base.clone(),
                config.generation.model.clone(),
                api_key,
            )),
        };

        Ok(Pipeline::new(ports, &config))
    }
}
