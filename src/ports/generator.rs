use async_trait::async_trait;

use crate::domain::DomainError;

/// Port for the text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return every candidate completion, best first.
    ///
    /// Backend rejections (auth, rate limit, content policy) map to
    /// `DomainError::Generation`. An empty list is not an error at this level.
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, DomainError>;
}
