#![forbid(unsafe_code)]

//! Turn a hosted video into a text summary: download, extract audio, stage it in
//! object storage, transcribe it with a long-running job and summarize the text.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::{AppController, Pipeline, PipelineOutcome, PipelinePorts};
pub use domain::{AppConfig, DomainError, PipelineError, Stage};
