use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::domain::{DomainError, SecretString};
use crate::ports::{HttpClient, TextGenerator};

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text generator backed by a chat-completions endpoint.
pub struct OpenAiTextGenerator {
    http: Arc<dyn HttpClient>,
    api_base: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiTextGenerator {
    pub fn new(
        http: Arc<dyn HttpClient>,
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, DomainError> {
        let url = format!("{}/v1/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let value = self
            .http
            .post_json(&url, Some(&self.api_key), &body)
            .await
            .map_err(|e| DomainError::Generation(e.to_string()))?;
        let completion: ChatCompletion = serde_json::from_value(value)
            .map_err(|e| DomainError::Generation(format!("unexpected completion response: {}", e)))?;

        // Positions are kept: a choice without content (refusal, tool call) is blank.
        let candidates: Vec<String> = completion
            .choices
            .into_iter()
            .map(|c| c.message.content.unwrap_or_default())
            .collect();
        info!(model = %self.model, candidates = candidates.len(), "Completion received");
        Ok(candidates)
    }
}
