use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use vidsum::AppController;

/// Summarize a hosted video.
#[derive(Debug, Parser)]
#[command(name = "vidsum", version, about)]
struct Args {
    /// Video URL or id. Falls back to `pipeline.video_identifier` from the config.
    url: Option<String>,

    /// Configuration file to use instead of the default one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parent directory for per-run scratch files.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Bucket that receives the extracted audio.
    #[arg(long)]
    bucket: Option<String>,

    /// Object key template, e.g. "{run_id}/audio.wav".
    #[arg(long)]
    object_key: Option<String>,

    /// Transcription language tag, e.g. "en-US".
    #[arg(long)]
    language: Option<String>,

    /// Print the full outcome as JSON instead of the summary text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let controller = AppController::new(args.config.as_deref()).context("failed to initialize")?;
    controller.apply_overrides(|config| {
        if let Some(dir) = &args.work_dir {
            config.pipeline.work_dir = dir.clone();
        }
        if let Some(bucket) = &args.bucket {
            config.storage.bucket_name = bucket.clone();
        }
        if let Some(template) = &args.object_key {
            config.storage.object_key_template = template.clone();
        }
        if let Some(language) = &args.language {
            config.transcription.language_code = language.clone();
        }
    })?;

    let identifier = match args.url.clone().or(controller.config().pipeline.video_identifier) {
        Some(identifier) => identifier,
        None => bail!("no video given; pass a URL or set pipeline.video_identifier"),
    };

    let pipeline = controller.build_pipeline()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cleaning up");
            on_signal.cancel();
        }
    });

    match pipeline.run(&identifier, &cancel).await {
        Ok(outcome) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.summary.text);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("error: {}", err);
            for cleanup in &err.cleanup_errors {
                eprintln!("  cleanup: {}", cleanup);
            }
            Ok(if err.is_cancelled() {
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
