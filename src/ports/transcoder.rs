use std::path::Path;

use async_trait::async_trait;

use crate::domain::{AudioFormat, DomainError};

/// Port for the external transcoding utility.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` to an audio-only file at `output` in the given format.
    ///
    /// Must not modify or delete `input`. Fails with `DomainError::Transcode`
    /// if the process cannot run or exits non-zero.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &AudioFormat,
    ) -> Result<(), DomainError>;
}
