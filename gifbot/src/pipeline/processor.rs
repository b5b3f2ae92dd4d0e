//! The production conversion pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::ffmpeg::FfmpegConverter;
use super::storage::{TaskWorkspace, download_to_file};
use super::{ConversionError, ConversionPipeline};
use crate::Result;
use crate::locale::{Locale, LocaleService};
use crate::scheduler::Task;
use crate::telegram::Transport;

/// Input and output limits enforced per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    /// Longest accepted source video, in seconds.
    pub max_video_duration_secs: u64,
    /// Largest GIF that will be sent.
    pub max_gif_size_bytes: u64,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            max_video_duration_secs: 20,
            max_gif_size_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Downloads the source video, converts it to a GIF and sends it back.
pub struct GifPipeline {
    transport: Arc<dyn Transport>,
    locales: Arc<LocaleService>,
    converter: FfmpegConverter,
    http: reqwest::Client,
    limits: PipelineLimits,
    temp_root: Option<PathBuf>,
}

impl GifPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        locales: Arc<LocaleService>,
        converter: FfmpegConverter,
        http: reqwest::Client,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            transport,
            locales,
            converter,
            http,
            limits,
            temp_root: None,
        }
    }

    /// Create task workspaces under `root` instead of the system temp dir.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    fn create_workspace(&self, task: &Task) -> Result<TaskWorkspace> {
        match &self.temp_root {
            Some(root) => TaskWorkspace::create_in(root, task.chat_id(), task.message_id()),
            None => TaskWorkspace::create(task.chat_id(), task.message_id()),
        }
    }

    async fn convert_and_deliver(
        &self,
        task: &Task,
        locale: &'static Locale,
    ) -> std::result::Result<(), ConversionError> {
        let chat_id = task.chat_id();

        let workspace = self
            .create_workspace(task)
            .map_err(|e| ConversionError::GetFile(e.to_string()))?;
        let video_path = workspace.video_path();
        let gif_path = workspace.gif_path();

        let url = self
            .transport
            .fetch_source_location(task.source())
            .await
            .map_err(|e| ConversionError::GetFile(e.to_string()))?;

        let bytes = download_to_file(&self.http, &url, &video_path)
            .await
            .map_err(|e| ConversionError::Download(e.to_string()))?;
        debug!(task_id = %task.id(), bytes, "Source downloaded");

        let duration = self.converter.probe_duration(&video_path).await?;
        if duration > self.limits.max_video_duration_secs as f64 {
            return Err(ConversionError::TooLong {
                duration,
                max_secs: self.limits.max_video_duration_secs,
            });
        }

        self.set_status(task, locale.processing).await;

        self.converter.convert_to_gif(&video_path, &gif_path).await?;

        let size = tokio::fs::metadata(&gif_path)
            .await
            .map_err(|e| ConversionError::CreateGif(e.to_string()))?
            .len();
        if size > self.limits.max_gif_size_bytes {
            return Err(ConversionError::TooLarge {
                size,
                limit: self.limits.max_gif_size_bytes,
            });
        }

        self.set_status(task, locale.sending_gif).await;

        self.transport
            .send_animation(chat_id, &gif_path, locale.gif_ready)
            .await
            .map_err(|e| ConversionError::SendGif(e.to_string()))?;

        if let Err(e) = self.transport.delete_status(chat_id, task.status()).await {
            debug!(task_id = %task.id(), error = %e, "Failed to delete status message");
        }

        info!(
            task_id = %task.id(),
            chat_id = %chat_id,
            duration_secs = duration,
            gif_bytes = size,
            "GIF delivered"
        );
        Ok(())
    }

    async fn set_status(&self, task: &Task, text: &str) {
        if let Err(e) = self
            .transport
            .update_status(task.chat_id(), task.status(), text)
            .await
        {
            debug!(task_id = %task.id(), error = %e, "Failed to update status message");
        }
    }
}

#[async_trait]
impl ConversionPipeline for GifPipeline {
    async fn run(&self, task: &Task) -> Result<()> {
        let start = Instant::now();
        let locale = self.locales.locale_for(task.chat_id());

        match self.convert_and_deliver(task, locale).await {
            Ok(()) => {
                debug!(task_id = %task.id(), elapsed = ?start.elapsed(), "Pipeline finished");
                Ok(())
            }
            Err(e) => {
                warn!(task_id = %task.id(), chat_id = %task.chat_id(), error = %e, "Conversion failed");
                let text = format!("❌ {}", locale.conversion_error(&e));
                if let Err(send_err) = self.transport.send_message(task.chat_id(), &text, None).await {
                    warn!(
                        task_id = %task.id(),
                        error = %send_err,
                        "Failed to report conversion error"
                    );
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use parking_lot::Mutex;

    use super::*;
    use crate::pipeline::GifSettings;
    use crate::scheduler::{ChatId, MessageId, Scheduler, SourceRef, TaskRequest};
    use crate::telegram::ReplyMarkup;

    #[derive(Default)]
    struct RecordingTransport {
        location: Option<String>,
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_message(
            &self,
            chat_id: ChatId,
            text: &str,
            _markup: Option<&ReplyMarkup>,
        ) -> Result<MessageId> {
            self.sent.lock().push((chat_id, text.to_string()));
            Ok(MessageId(1))
        }

        async fn edit_message(&self, _: ChatId, _: MessageId, _: &str) -> Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _: ChatId, _: MessageId) -> Result<()> {
            Ok(())
        }

        async fn answer_callback(&self, _: &str) -> Result<()> {
            Ok(())
        }

        async fn fetch_source_location(&self, _: &SourceRef) -> Result<String> {
            self.location
                .clone()
                .ok_or_else(|| crate::Error::telegram("getFile", "Bad Request: invalid file_id"))
        }

        async fn send_animation(&self, _: ChatId, _: &Path, _: &str) -> Result<MessageId> {
            Ok(MessageId(2))
        }
    }

    fn task() -> Task {
        let scheduler = Scheduler::with_capacity(1).unwrap();
        scheduler
            .submit(TaskRequest::new(
                ChatId(5),
                MessageId(10),
                SourceRef::new("file"),
                MessageId(11),
            ))
            .into_task()
    }

    fn pipeline(transport: Arc<RecordingTransport>, root: &Path) -> GifPipeline {
        crate::utils::http_client::install_rustls_provider();
        let locales = Arc::new(LocaleService::new());
        locales.set_language_code(ChatId(5), "en");
        GifPipeline::new(
            transport,
            locales,
            FfmpegConverter::new("ffmpeg", "ffprobe", GifSettings::default()),
            reqwest::Client::new(),
            PipelineLimits::default(),
        )
        .with_temp_root(root)
    }

    #[tokio::test]
    async fn test_get_file_failure_reports_to_chat() {
        let root = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(transport.clone(), root.path());

        let err = pipeline.run(&task()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Conversion(ConversionError::GetFile(_))
        ));

        let sent = transport.sent.lock().clone();
        assert_eq!(sent, vec![(ChatId(5), "❌ Failed to get video file".to_string())]);
    }

    #[tokio::test]
    async fn test_download_failure_reports_to_chat() {
        let root = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport {
            location: Some("http://127.0.0.1:9/file/bot/video.mp4".to_string()),
            ..Default::default()
        });
        let pipeline = pipeline(transport.clone(), root.path());

        let err = pipeline.run(&task()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Conversion(ConversionError::Download(_))
        ));
        assert_eq!(
            transport.sent.lock()[0].1,
            "❌ Failed to download video".to_string()
        );
    }

    #[tokio::test]
    async fn test_workspace_cleaned_after_failure() {
        let root = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport {
            location: Some("http://127.0.0.1:9/video.mp4".to_string()),
            ..Default::default()
        });
        let pipeline = pipeline(transport, root.path());

        let _ = pipeline.run(&task()).await;
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_default_limits() {
        let limits = PipelineLimits::default();
        assert_eq!(limits.max_video_duration_secs, 20);
        assert_eq!(limits.max_gif_size_bytes, 20_971_520);
    }
}
