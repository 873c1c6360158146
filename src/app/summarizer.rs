use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{DomainError, Summary, SummaryRequest, Transcript};
use crate::ports::TextGenerator;

/// Turns a transcript into a summary with a single generation request.
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Only the first candidate is used. A missing or blank one is `EmptyResponse`.
    pub async fn summarize(&self, title: &str, transcript: &Transcript) -> Result<Summary, DomainError> {
        let prompt = SummaryRequest {
            title,
            transcript: &transcript.text,
        }
        .prompt();

        info!(title = %title, prompt_chars = prompt.len(), "Requesting summary");
        let candidates = self.generator.generate(&prompt).await?;
        if candidates.len() > 1 {
            warn!(count = candidates.len(), "Ignoring extra summary candidates");
        }

        let text = candidates
            .into_iter()
            .next()
            .filter(|text| !text.trim().is_empty())
            .ok_or(DomainError::EmptyResponse)?;
        Ok(Summary { text })
    }
}
