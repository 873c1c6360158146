use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::video::select_format;
use crate::domain::{
    DomainError, FormatConstraints, FormatDescriptor, LocalMediaFile, VideoRef,
};
use crate::ports::VideoSource;

/// Log a progress line every this many bytes.
const PROGRESS_STEP_BYTES: u64 = 8 * 1024 * 1024;

fn transfer_error(e: DomainError) -> DomainError {
    match e {
        DomainError::Transfer(_) | DomainError::Cancelled => e,
        other => DomainError::Transfer(other.to_string()),
    }
}

/// Resolves a video and materializes one of its streams on disk.
pub struct MediaFetcher {
    source: Arc<dyn VideoSource>,
    constraints: FormatConstraints,
}

impl MediaFetcher {
    pub fn new(source: Arc<dyn VideoSource>, constraints: FormatConstraints) -> Self {
        Self {
            source,
            constraints,
        }
    }

    pub async fn resolve(&self, identifier: &str) -> Result<VideoRef, DomainError> {
        self.source.resolve(identifier).await
    }

    /// Pick the stream to download. `NoFormatAvailable` is fatal for the run.
    pub fn select_format(&self, video: &VideoRef) -> Result<FormatDescriptor, DomainError> {
        let format = select_format(video, &self.constraints)?;
        info!(
            itag = format.itag,
            codec = %format.codec,
            channels = format.audio_channels,
            quality = %format.quality,
            "Format selected"
        );
        Ok(format)
    }

    /// Stream the chosen format into `file`.
    ///
    /// On success the file is flushed to disk and marked complete. On error the
    /// partial file stays in place for its owner to delete.
    pub async fn download(
        &self,
        video: &VideoRef,
        format: &FormatDescriptor,
        file: &mut LocalMediaFile,
        cancel: &CancellationToken,
    ) -> Result<u64, DomainError> {
        let (declared, mut stream) = self
            .source
            .open_stream(video, format)
            .await
            .map_err(transfer_error)?;

        info!(path = ?file.path(), declared_bytes = ?declared, "Downloading video");
        let mut sink = tokio::fs::File::create(file.path())
            .await
            .map_err(|e| DomainError::Transfer(format!("cannot create {}: {}", file.path().display(), e)))?;

        let mut written: u64 = 0;
        let mut next_report = PROGRESS_STEP_BYTES;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DomainError::Cancelled),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk.map_err(transfer_error)?;

            sink.write_all(&chunk)
                .await
                .map_err(|e| DomainError::Transfer(format!("write failed: {}", e)))?;
            written += chunk.len() as u64;

            if written >= next_report {
                debug!(bytes = written, total = ?declared, "Download progress");
                next_report += PROGRESS_STEP_BYTES;
            }
        }

        sink.flush()
            .await
            .map_err(|e| DomainError::Transfer(format!("flush failed: {}", e)))?;
        sink.sync_all()
            .await
            .map_err(|e| DomainError::Transfer(format!("sync failed: {}", e)))?;
        drop(sink);

        if let Some(expected) = declared {
            if expected != written {
                return Err(DomainError::Transfer(format!(
                    "stream ended after {} of {} bytes",
                    written, expected
                )));
            }
        }

        let len = file.mark_complete()?;
        info!(path = ?file.path(), bytes = len, "Download complete");
        Ok(len)
    }
}
