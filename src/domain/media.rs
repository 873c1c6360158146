use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::DomainError;

const MAX_FILE_STEM_LEN: usize = 120;

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Lifecycle of a transient local file.
///
/// State transitions:
/// - Downloading -> Complete (mark_complete)
/// - Downloading | Complete -> Deleted (delete or drop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    /// Being written; contents may be partial.
    Downloading,
    /// Fully written and flushed.
    Complete,
    /// Removed from disk. Terminal.
    Deleted,
}

/// A transient file owned by a single pipeline run.
///
/// Deletion is idempotent and the path is never touched again once deleted,
/// so a second delete cannot remove a file someone else created at the same path.
/// Dropping an undeleted guard removes the file.
#[derive(Debug)]
pub struct LocalMediaFile {
    path: PathBuf,
    byte_len: u64,
    state: FileState,
}

impl LocalMediaFile {
    /// Claim a path for a file about to be written. Does not touch the disk.
    pub fn reserve(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            byte_len: 0,
            state: FileState::Downloading,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == FileState::Complete
    }

    /// Mark the file fully written, recording its size from disk.
    pub fn mark_complete(&mut self) -> Result<u64, DomainError> {
        if self.state == FileState::Deleted {
            return Err(DomainError::Io(format!(
                "{} was already deleted",
                self.path.display()
            )));
        }
        let len = std::fs::metadata(&self.path)?.len();
        self.byte_len = len;
        self.state = FileState::Complete;
        Ok(len)
    }

    /// Remove the file. Calling this more than once is a no-op.
    pub fn delete(&mut self) -> Result<(), DomainError> {
        if self.state == FileState::Deleted {
            return Ok(());
        }
        // Terminal even if removal fails; a retry must not hit a reused path.
        self.state = FileState::Deleted;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = ?self.path, "Removed transient file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Io(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl Drop for LocalMediaFile {
    fn drop(&mut self) {
        if let Err(e) = self.delete() {
            warn!(error = %e, "Transient file left behind");
        }
    }
}

/// Sample encoding understood by the transcription backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoding {
    /// Signed 16-bit little-endian PCM.
    #[serde(rename = "LINEAR16")]
    Linear16,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample layout of an extracted audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub encoding: AudioEncoding,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Mono 16-bit PCM at the given rate.
    pub fn canonical(sample_rate_hz: u32) -> Self {
        Self {
            encoding: AudioEncoding::Linear16,
            sample_rate_hz,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

/// Extracted PCM audio ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub byte_len: u64,
    pub format: AudioFormat,
}

/// Make a video title safe to use as a file stem.
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_control()
                || matches!(c, '/' | '\\' | '"' | '<' | '>' | '|' | ':' | '*' | '?')
            {
                '_'
            } else {
                c
            }
        })
        .take(MAX_FILE_STEM_LEN)
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

/// Identifier of one pipeline run, used to namespace local and remote artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// A fresh id, unique within the process and across concurrent processes.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let counter = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Sha256::new();
        hasher.update(nanos.to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self(digest[..12].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"data").unwrap();

        let mut file = LocalMediaFile::reserve(&path);
        assert_eq!(file.mark_complete().unwrap(), 4);
        file.delete().unwrap();
        assert!(!path.exists());
        assert_eq!(file.state(), FileState::Deleted);

        // A new file at the same path belongs to someone else now.
        std::fs::write(&path, b"unrelated").unwrap();
        file.delete().unwrap();
        drop(file);
        assert_eq!(std::fs::read(&path).unwrap(), b"unrelated");
    }

    #[test]
    fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = LocalMediaFile::reserve(dir.path().join("never-written.wav"));
        assert!(file.delete().is_ok());
    }

    #[test]
    fn test_drop_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.mp4");
        {
            let _file = LocalMediaFile::reserve(&path);
            std::fs::write(&path, b"par").unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_mark_complete_after_delete_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = LocalMediaFile::reserve(dir.path().join("x.wav"));
        file.delete().unwrap();
        assert!(file.mark_complete().is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a/b:c*"), "a_b_c_");
        assert_eq!(sanitize_file_name("  ..  "), "video");
        assert_eq!(sanitize_file_name("Demo"), "Demo");
        assert_eq!(sanitize_file_name(&"x".repeat(500)).len(), MAX_FILE_STEM_LEN);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 12);
    }

    #[test]
    fn test_canonical_format() {
        let format = AudioFormat::canonical(16_000);
        assert_eq!(format.encoding, AudioEncoding::Linear16);
        assert_eq!(format.channels, 1);
        assert_eq!(format.bits_per_sample, 16);
    }
}
