use async_trait::async_trait;

use crate::domain::{DomainError, RemoteObjectRef};

/// Port for durable object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` as a single object.
    ///
    /// Either the whole object exists under the key afterwards or an error is
    /// returned; a failed write is never reported as success.
    async fn put(
        &self,
        object: &RemoteObjectRef,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), DomainError>;

    /// Remove an object. Removing a missing object succeeds.
    async fn delete(&self, object: &RemoteObjectRef) -> Result<(), DomainError>;
}
