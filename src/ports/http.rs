use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use serde_json::Value;

use crate::domain::{DomainError, SecretString};

/// Chunked response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DomainError>> + Send>>;

/// HTTP client port for all network requests.
/// All network traffic must go through this interface.
///
/// Non-success statuses are returned as `DomainError::HttpRequest` carrying the
/// status code and a prefix of the response body.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request and parse the response as JSON.
    async fn get_json(&self, url: &str, auth: Option<&SecretString>) -> Result<Value, DomainError>;

    /// Perform a POST request with a JSON body.
    async fn post_json(
        &self,
        url: &str,
        auth: Option<&SecretString>,
        body: &Value,
    ) -> Result<Value, DomainError>;

    /// Perform a POST request with a raw body in a single request.
    async fn post_bytes(
        &self,
        url: &str,
        auth: Option<&SecretString>,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Value, DomainError>;

    /// Perform a DELETE request.
    ///
    /// Returns `false` when the resource did not exist.
    async fn delete(&self, url: &str, auth: Option<&SecretString>) -> Result<bool, DomainError>;

    /// Start a GET request and return the declared length and the body stream.
    async fn get_stream(&self, url: &str) -> Result<(Option<u64>, ByteStream), DomainError>;
}
