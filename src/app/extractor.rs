use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};
use tracing::info;

use crate::domain::{AudioArtifact, AudioEncoding, AudioFormat, DomainError, LocalMediaFile};
use crate::ports::Transcoder;

/// Read the WAV header of `path` and describe its sample layout.
fn probe_wav(path: &Path) -> Result<AudioFormat, DomainError> {
    let reader = WavReader::open(path)
        .map_err(|e| DomainError::Transcode(format!("output is not a readable WAV file: {}", e)))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int {
        return Err(DomainError::Transcode("output has float samples".to_string()));
    }
    Ok(AudioFormat {
        encoding: AudioEncoding::Linear16,
        sample_rate_hz: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
    })
}

/// Derives the canonical PCM track from a downloaded media file.
pub struct AudioExtractor {
    transcoder: Arc<dyn Transcoder>,
    format: AudioFormat,
}

impl AudioExtractor {
    pub fn new(transcoder: Arc<dyn Transcoder>, format: AudioFormat) -> Self {
        Self { transcoder, format }
    }

    /// Transcode `input` into `output` and check the result really has the target layout.
    ///
    /// `input` is only read. `output` is marked complete on success; on failure it
    /// is left for its owner to delete.
    pub async fn extract(
        &self,
        input: &LocalMediaFile,
        output: &mut LocalMediaFile,
    ) -> Result<AudioArtifact, DomainError> {
        if !input.is_complete() {
            return Err(DomainError::Transcode(format!(
                "{} is not fully downloaded",
                input.path().display()
            )));
        }

        info!(input = ?input.path(), output = ?output.path(), "Extracting audio");
        self.transcoder
            .transcode(input.path(), output.path(), &self.format)
            .await?;

        let produced = probe_wav(output.path())?;
        if produced != self.format {
            return Err(DomainError::Transcode(format!(
                "expected {} Hz/{} ch/{} bit, got {} Hz/{} ch/{} bit",
                self.format.sample_rate_hz,
                self.format.channels,
                self.format.bits_per_sample,
                produced.sample_rate_hz,
                produced.channels,
                produced.bits_per_sample
            )));
        }

        let byte_len = output.mark_complete()?;
        Ok(AudioArtifact {
            path: output.path().to_path_buf(),
            byte_len,
            format: produced,
        })
    }
}
