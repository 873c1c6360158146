use serde::{Deserialize, Serialize};

/// Input to the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest<'a> {
    pub title: &'a str,
    pub transcript: &'a str,
}

impl SummaryRequest<'_> {
    /// Single-turn prompt sent to the generation backend.
    pub fn prompt(&self) -> String {
        format!(
            "Using this video transcript (title: {}), generate an engaging summary, \
             removing anything resembling an advertisement.\n\nTranscript:\n{}",
            self.title, self.transcript
        )
    }
}

/// Terminal artifact of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
}
