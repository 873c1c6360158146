pub mod controller;
pub mod coordinator;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod stager;
pub mod summarizer;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::domain::DomainError;

pub use controller::AppController;
pub use coordinator::TranscriptionCoordinator;
pub use extractor::AudioExtractor;
pub use fetcher::MediaFetcher;
pub use pipeline::{Pipeline, PipelineOutcome, PipelinePorts};
pub use stager::RemoteStager;
pub use summarizer::Summarizer;

/// Race `fut` against cancellation. Cancellation wins ties.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DomainError::Cancelled),
        result = fut => result,
    }
}
