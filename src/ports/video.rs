use async_trait::async_trait;

use crate::domain::{DomainError, FormatDescriptor, VideoRef};
use crate::ports::http::ByteStream;

/// Port for the video host.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Resolve a URL or id to the video's title and available streams.
    ///
    /// Fails with `DomainError::Resolution` if the identifier cannot be parsed
    /// or the host is unreachable.
    async fn resolve(&self, identifier: &str) -> Result<VideoRef, DomainError>;

    /// Open the byte stream of one of the video's formats.
    ///
    /// Returns the declared length, when known, alongside the stream.
    async fn open_stream(
        &self,
        video: &VideoRef,
        format: &FormatDescriptor,
    ) -> Result<(Option<u64>, ByteStream), DomainError>;
}
