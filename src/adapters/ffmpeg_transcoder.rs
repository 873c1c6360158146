use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::{AudioEncoding, AudioFormat, DomainError};
use crate::ports::Transcoder;

/// Lines of ffmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 5;

/// Transcoder backed by the `ffmpeg` executable.
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn codec_name(format: &AudioFormat) -> &'static str {
        match format.encoding {
            AudioEncoding::Linear16 => "pcm_s16le",
        }
    }

    /// Argument list: drop video, PCM codec, resample, downmix.
    fn args(input: &Path, output: &Path, format: &AudioFormat) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vn".into(),
            "-acodec".into(),
            Self::codec_name(format).into(),
            "-ar".into(),
            format.sample_rate_hz.to_string().into(),
            "-ac".into(),
            format.channels.to_string().into(),
            output.as_os_str().to_owned(),
        ]
    }

    fn stderr_tail(stderr: &[u8]) -> String {
        let text = String::from_utf8_lossy(stderr);
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
        lines[start..].join(" | ")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &AudioFormat,
    ) -> Result<(), DomainError> {
        let args = Self::args(input, output, format);
        debug!(binary = ?self.binary, ?args, "Running transcoder");

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DomainError::Transcode(format!("failed to start {}: {}", self.binary.display(), e))
            })?;

        if !result.status.success() {
            return Err(DomainError::Transcode(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                result.status,
                Self::stderr_tail(&result.stderr)
            )));
        }

        let produced = tokio::fs::metadata(output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if produced == 0 {
            return Err(DomainError::Transcode(format!(
                "{} produced no output at {}",
                self.binary.display(),
                output.display()
            )));
        }

        debug!(output = ?output, bytes = produced, "Transcoder finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_match_target_format() {
        let args = FfmpegTranscoder::args(
            Path::new("in.mp4"),
            Path::new("audio.wav"),
            &AudioFormat::canonical(16_000),
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let joined = args.join(" ");
        assert!(joined.contains("-i in.mp4 -vn -acodec pcm_s16le -ar 16000 -ac 1 audio.wav"));
        assert_eq!(args.first().map(String::as_str), Some("-y"));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = b"a\nb\n\nc\nd\ne\nf\ng\n";
        assert_eq!(FfmpegTranscoder::stderr_tail(stderr), "c | d | e | f | g");
    }

    #[tokio::test]
    async fn test_missing_binary_is_transcode_error() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(dir.path().join("no-such-ffmpeg"));
        let err = transcoder
            .transcode(
                &dir.path().join("in.mp4"),
                &dir.path().join("out.wav"),
                &AudioFormat::canonical(16_000),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Transcode(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_transcode_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"not really a video").unwrap();

        let err = FfmpegTranscoder::new("false")
            .transcode(&input, &dir.path().join("out.wav"), &AudioFormat::canonical(16_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Transcode(ref m) if m.contains("exited")));
        assert!(input.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_output_is_transcode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FfmpegTranscoder::new("true")
            .transcode(
                &dir.path().join("in.mp4"),
                &dir.path().join("out.wav"),
                &AudioFormat::canonical(16_000),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Transcode(ref m) if m.contains("no output")));
    }
}
