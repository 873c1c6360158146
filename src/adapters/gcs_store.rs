use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::domain::{DomainError, RemoteObjectRef, SecretString};
use crate::ports::{HttpClient, ObjectStore};

/// Object store speaking the Cloud Storage JSON API.
///
/// Uploads use a single media request, which the service commits atomically.
pub struct GcsObjectStore {
    http: Arc<dyn HttpClient>,
    api_base: String,
    token: SecretString,
}

impl GcsObjectStore {
    pub fn new(http: Arc<dyn HttpClient>, api_base: impl Into<String>, token: SecretString) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// `api_base` with `segments` appended, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DomainError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| DomainError::Config(format!("invalid storage api_base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DomainError::Config(format!("storage api_base {} cannot take a path", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn upload_url(&self, object: &RemoteObjectRef) -> Result<Url, DomainError> {
        let mut url = self.endpoint(&["upload", "storage", "v1", "b", &object.bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &object.key);
        Ok(url)
    }

    fn object_url(&self, object: &RemoteObjectRef) -> Result<Url, DomainError> {
        self.endpoint(&["storage", "v1", "b", &object.bucket, "o", &object.key])
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(
        &self,
        object: &RemoteObjectRef,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), DomainError> {
        let url = self.upload_url(object)?;
        let expected = data.len() as u64;
        debug!(object = %object, bytes = expected, "Uploading object");

        let response = self
            .http
            .post_bytes(url.as_str(), Some(&self.token), content_type, data)
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        // The service reports size as a decimal string.
        let stored = response
            .get("size")
            .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_u64().map(|n| n.to_string())))
            .and_then(|s| s.parse::<u64>().ok());
        if let Some(stored) = stored {
            if stored != expected {
                return Err(DomainError::Storage(format!(
                    "{} stored {} bytes, expected {}",
                    object, stored, expected
                )));
            }
        }

        info!(object = %object, bytes = expected, "Object uploaded");
        Ok(())
    }

    async fn delete(&self, object: &RemoteObjectRef) -> Result<(), DomainError> {
        let existed = self
            .http
            .delete(self.object_url(object)?.as_str(), Some(&self.token))
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        debug!(object = %object, existed = existed, "Object deleted");
        Ok(())
    }
}
