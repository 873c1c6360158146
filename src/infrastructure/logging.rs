use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::config::LoggingConfig;
use crate::domain::DomainError;

const LOG_FILE_PREFIX: &str = "vidsum";

/// Default directive set when `RUST_LOG` is not set.
fn default_directives(level: &str) -> String {
    format!("vidsum={},warn", level)
}

/// Initialize console logging on stderr and, if enabled, a rotated JSON log file.
///
/// Stdout is left to the summary output. Returns a guard that must be kept
/// alive while logging; dropping it flushes the file writer.
pub fn init_logging(
    logs_dir: &Path,
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, DomainError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(env_filter);

    if config.file_logging {
        fs::create_dir_all(logs_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(config.max_files.max(1) as usize)
            .build(logs_dir)
            .map_err(|e| DomainError::Config(format!("cannot open log directory: {}", e)))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Span close events carry per-stage timings.
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(EnvFilter::new(format!("vidsum={}", config.level)));

        // try_init so a second call (tests, embedding) does not panic
        if tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .is_ok()
        {
            tracing::debug!(
                logs_dir = ?logs_dir,
                level = %config.level,
                max_files = config.max_files,
                "Logging initialized with file output"
            );
        }

        Ok(Some(guard))
    } else {
        let _ = tracing_subscriber::registry().with(console_layer).try_init();
        tracing::debug!(level = %config.level, "Logging initialized (console only)");
        Ok(None)
    }
}
