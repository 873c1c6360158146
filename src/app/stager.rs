use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::config::StorageConfig;
use crate::domain::{AudioArtifact, DomainError, RemoteObjectRef, RunId};
use crate::ports::ObjectStore;

const WAV_CONTENT_TYPE: &str = "audio/wav";

/// An artifact read into memory and assigned its object key, not yet uploaded.
#[derive(Debug)]
pub struct PreparedUpload {
    pub object: RemoteObjectRef,
    pub sha256: String,
    data: Vec<u8>,
}

/// Uploads extracted audio to object storage under a deterministic key.
pub struct RemoteStager {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
}

impl RemoteStager {
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        Self { store, config }
    }

    /// Read the artifact fully and derive its key from the run, video and content hash.
    pub async fn prepare(
        &self,
        artifact: &AudioArtifact,
        run_id: &RunId,
        video_id: &str,
    ) -> Result<PreparedUpload, DomainError> {
        let data = tokio::fs::read(&artifact.path).await.map_err(|e| {
            DomainError::Storage(format!("cannot read {}: {}", artifact.path.display(), e))
        })?;
        if data.len() as u64 != artifact.byte_len {
            return Err(DomainError::Storage(format!(
                "{} changed size since extraction",
                artifact.path.display()
            )));
        }

        let sha256 = format!("{:x}", Sha256::digest(&data));
        let key = self.config.render_key(run_id.as_str(), video_id, &sha256);
        Ok(PreparedUpload {
            object: RemoteObjectRef::new(self.config.bucket_name.clone(), key),
            sha256,
            data,
        })
    }

    /// Write the object in one request.
    ///
    /// A failed write triggers a best-effort delete so no partial object stays
    /// under the key; the write error is what the caller sees.
    pub async fn upload(&self, prepared: PreparedUpload) -> Result<RemoteObjectRef, DomainError> {
        let PreparedUpload {
            object,
            sha256,
            data,
        } = prepared;
        let bytes = data.len();

        info!(object = %object, bytes = bytes, "Uploading audio");
        if let Err(e) = self.store.put(&object, WAV_CONTENT_TYPE, data).await {
            if let Err(rollback) = self.store.delete(&object).await {
                warn!(object = %object, error = %rollback, "Rollback of failed upload failed");
            }
            return Err(match e {
                DomainError::Storage(_) | DomainError::Cancelled => e,
                other => DomainError::Storage(other.to_string()),
            });
        }

        info!(object = %object, sha256 = %sha256, "Audio staged");
        Ok(object)
    }

    /// Delete a staged object. A missing object is not an error.
    pub async fn remove(&self, object: &RemoteObjectRef) -> Result<(), DomainError> {
        info!(object = %object, "Deleting staged audio");
        self.store.delete(object).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AudioFormat;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        fail_put: bool,
        puts: Mutex<Vec<(String, usize)>>,
        deletes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put(
            &self,
            object: &RemoteObjectRef,
            _content_type: &str,
            data: Vec<u8>,
        ) -> Result<(), DomainError> {
            if self.fail_put {
                return Err(DomainError::Storage("quota exceeded".to_string()));
            }
            self.puts.lock().push((object.key.clone(), data.len()));
            Ok(())
        }

        async fn delete(&self, object: &RemoteObjectRef) -> Result<(), DomainError> {
            self.deletes.lock().push(object.key.clone());
            Ok(())
        }
    }

    fn artifact(dir: &std::path::Path) -> AudioArtifact {
        let path = dir.join("audio.wav");
        std::fs::write(&path, b"RIFFdata").unwrap();
        AudioArtifact {
            path,
            byte_len: 8,
            format: AudioFormat::canonical(16_000),
        }
    }

    #[tokio::test]
    async fn test_upload_renders_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let config = StorageConfig {
            object_key_template: "{video_id}/{run_id}.wav".to_string(),
            ..StorageConfig::default()
        };
        let stager = RemoteStager::new(store.clone(), config);
        let run_id = RunId::generate();

        let prepared = stager.prepare(&artifact(dir.path()), &run_id, "GnTKxPQfHRM").await.unwrap();
        assert_eq!(prepared.sha256.len(), 64);
        let object = stager.upload(prepared).await.unwrap();

        assert_eq!(object.bucket, "yt_summary");
        assert_eq!(object.key, format!("GnTKxPQfHRM/{}.wav", run_id));
        assert_eq!(store.puts.lock().as_slice(), &[(object.key.clone(), 8)]);
    }

    #[tokio::test]
    async fn test_same_content_same_hash_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            object_key_template: "{sha256}.wav".to_string(),
            ..StorageConfig::default()
        };
        let stager = RemoteStager::new(Arc::new(MemoryStore::default()), config);
        let a = stager.prepare(&artifact(dir.path()), &RunId::generate(), "v").await.unwrap();
        let b = stager.prepare(&artifact(dir.path()), &RunId::generate(), "v").await.unwrap();
        assert_eq!(a.object, b.object);
    }

    #[tokio::test]
    async fn test_failed_put_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore {
            fail_put: true,
            ..MemoryStore::default()
        });
        let config = StorageConfig {
            object_key_template: "audio.wav".to_string(),
            ..StorageConfig::default()
        };
        let stager = RemoteStager::new(store.clone(), config);

        let prepared = stager.prepare(&artifact(dir.path()), &RunId::generate(), "v").await.unwrap();
        let err = stager.upload(prepared).await.unwrap_err();

        assert!(matches!(err, DomainError::Storage(ref m) if m.contains("quota")));
        assert_eq!(store.deletes.lock().as_slice(), &["audio.wav".to_string()]);
    }

    #[tokio::test]
    async fn test_size_change_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let mut stale = artifact(dir.path());
        stale.byte_len = 100;
        let stager = RemoteStager::new(Arc::new(MemoryStore::default()), StorageConfig::default());
        assert!(matches!(
            stager.prepare(&stale, &RunId::generate(), "v").await,
            Err(DomainError::Storage(_))
        ));
    }
}
