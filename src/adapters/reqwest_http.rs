use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::domain::{DomainError, SecretString};
use crate::ports::{ByteStream, HttpClient};

/// Longest response body prefix kept in error messages.
const ERROR_BODY_LIMIT: usize = 300;
/// Slowest upload throughput tolerated before a body upload times out.
const UPLOAD_BYTES_PER_SEC: usize = 256 * 1024;

/// The one HTTP client all adapters share.
///
/// JSON requests are bounded by `request_timeout`; streams only by the connect
/// timeout, since a download may legitimately take a long time.
pub struct ReqwestHttpClient {
    client: Client,
    request_timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new(request_timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(format!("vidsum/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DomainError::HttpRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    fn authorize(builder: RequestBuilder, auth: Option<&SecretString>) -> RequestBuilder {
        match auth {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response, DomainError> {
        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::HttpRequest(format!("{} for {}", e, url)))?;
        Self::check_status(response, url).await
    }

    async fn check_status(response: Response, url: &str) -> Result<Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        Err(DomainError::HttpRequest(format!(
            "HTTP {} for {}: {}",
            status,
            url,
            snippet.trim()
        )))
    }

    async fn into_json(response: Response) -> Result<Value, DomainError> {
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::HttpRequest(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Request budget for a body upload: the base timeout plus one second per 256 KiB.
fn upload_timeout(base: Duration, len: usize) -> Duration {
    base + Duration::from_secs((len / UPLOAD_BYTES_PER_SEC) as u64)
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get_json(&self, url: &str, auth: Option<&SecretString>) -> Result<Value, DomainError> {
        debug!(url = url, "GET");
        let builder = Self::authorize(self.client.get(url), auth).timeout(self.request_timeout);
        let response = self.send(builder, url).await?;
        Self::into_json(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        auth: Option<&SecretString>,
        body: &Value,
    ) -> Result<Value, DomainError> {
        debug!(url = url, "POST json");
        let builder = Self::authorize(self.client.post(url), auth)
            .timeout(self.request_timeout)
            .json(body);
        let response = self.send(builder, url).await?;
        Self::into_json(response).await
    }

    async fn post_bytes(
        &self,
        url: &str,
        auth: Option<&SecretString>,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Value, DomainError> {
        debug!(url = url, bytes = body.len(), "POST bytes");
        let builder = Self::authorize(self.client.post(url), auth)
            .timeout(upload_timeout(self.request_timeout, body.len()))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        let response = self.send(builder, url).await?;
        Self::into_json(response).await
    }

    async fn delete(&self, url: &str, auth: Option<&SecretString>) -> Result<bool, DomainError> {
        debug!(url = url, "DELETE");
        let response = Self::authorize(self.client.delete(url), auth)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| DomainError::HttpRequest(format!("{} for {}", e, url)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check_status(response, url).await?;
        Ok(true)
    }

    async fn get_stream(&self, url: &str) -> Result<(Option<u64>, ByteStream), DomainError> {
        debug!(url = url, "GET stream");
        let response = self.send(self.client.get(url), url).await?;
        let length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| DomainError::Transfer(e.to_string())));
        Ok((length, Box::pin(stream)))
    }
}
