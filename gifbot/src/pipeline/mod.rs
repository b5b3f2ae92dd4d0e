//! Video to GIF conversion pipeline.
//!
//! The scheduler only knows the [`ConversionPipeline`] trait; [`GifPipeline`]
//! is the production implementation that downloads the source video, probes
//! and converts it with ffmpeg, and delivers the result to the chat.

mod ffmpeg;
mod processor;
mod storage;

use async_trait::async_trait;
use thiserror::Error;

use crate::Result;
use crate::scheduler::Task;

pub use ffmpeg::{FfmpegConverter, GifSettings, palette_filter, paletteuse_filter, scale_filter};
pub use processor::{GifPipeline, PipelineLimits};
pub use storage::{TaskWorkspace, download_to_file};

/// Runs one task through conversion and delivery.
///
/// Implementations report failures to the requester themselves; the returned
/// error is only used for logging and the completion event.
#[async_trait]
pub trait ConversionPipeline: Send + Sync {
    async fn run(&self, task: &Task) -> Result<()>;
}

/// Failure of a single pipeline stage.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("failed to resolve source file: {0}")]
    GetFile(String),

    #[error("failed to download source: {0}")]
    Download(String),

    #[error("failed to probe duration: {0}")]
    Duration(String),

    #[error("video too long: {duration:.2}s exceeds {max_secs}s")]
    TooLong { duration: f64, max_secs: u64 },

    #[error("ffmpeg conversion failed: {0}")]
    Convert(String),

    #[error("GIF output missing: {0}")]
    CreateGif(String),

    #[error("GIF too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("failed to send GIF: {0}")]
    SendGif(String),
}
