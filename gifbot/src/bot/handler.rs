//! Incoming update handling: commands, language selection and video intake.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::locale::{Language, Locale, LocaleService};
use crate::scheduler::{Admission, ChatId, Dispatcher, MessageId, SourceRef, TaskRequest};
use crate::telegram::keyboard::{
    HELP_BUTTON, LANGUAGE_BUTTON, LANGUAGE_CALLBACK_PREFIX, language_keyboard, main_keyboard,
};
use crate::telegram::{CallbackQuery, Message, Transport, Update};

/// MIME types accepted as video documents.
const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/webm",
    "video/x-matroska",
    "video/x-ms-wmv",
];

/// File extensions accepted as video documents when the MIME type does not match.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "mkv", "wmv", "flv"];

/// What the handler did with an update.
#[derive(Debug)]
pub enum HandleOutcome {
    /// Nothing the bot reacts to.
    Ignored,
    /// A command or keyboard button was answered.
    Replied,
    LanguageChanged(Language),
    /// A document that is not a video; the user was asked for a video.
    NotVideo,
    /// The status placeholder could not be sent, so the video was not queued.
    Dropped,
    Submitted(Admission),
}

/// Whether a document looks like a video, by MIME type or file extension.
pub fn is_video_document(mime_type: Option<&str>, file_name: Option<&str>) -> bool {
    if mime_type.is_some_and(|mime| VIDEO_MIME_TYPES.contains(&mime.to_ascii_lowercase().as_str())) {
        return true;
    }

    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Strip a `@botname` suffix from a command.
fn normalize_command(text: &str) -> &str {
    let text = text.trim();
    match text.split_once('@') {
        Some((command, _)) if command.starts_with('/') => command,
        _ => text,
    }
}

/// Dispatches each update to the matching action.
pub struct UpdateHandler {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    locales: Arc<LocaleService>,
}

impl UpdateHandler {
    pub fn new(
        transport: Arc<dyn Transport>,
        dispatcher: Arc<Dispatcher>,
        locales: Arc<LocaleService>,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            locales,
        }
    }

    pub async fn handle(&self, update: Update) -> HandleOutcome {
        if let Some(callback) = update.callback_query {
            return self.handle_callback(callback).await;
        }

        let Some(message) = update.message else {
            return HandleOutcome::Ignored;
        };

        let chat_id = message.chat.id;
        let locale = self.locales.locale_for(chat_id);

        if let Some(text) = message.text.as_deref() {
            return self.handle_text(chat_id, text, locale).await;
        }

        if let Some(video) = &message.video {
            return self
                .submit_video(chat_id, message.message_id, &video.file_id, locale)
                .await;
        }

        if message.document.is_some() {
            return self.handle_document(&message, locale).await;
        }

        HandleOutcome::Ignored
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> HandleOutcome {
        let Some(code) = callback
            .data
            .as_deref()
            .and_then(|data| data.strip_prefix(LANGUAGE_CALLBACK_PREFIX))
        else {
            return HandleOutcome::Ignored;
        };
        let Some(selection) = callback.message else {
            debug!(callback_id = %callback.id, "Language callback without message");
            return HandleOutcome::Ignored;
        };

        let chat_id = selection.chat.id;
        let language = self.locales.set_language_code(chat_id, code);
        let locale = language.locale();

        if let Err(e) = self.transport.answer_callback(&callback.id).await {
            debug!(callback_id = %callback.id, error = %e, "Failed to answer callback");
        }
        self.reply(chat_id, locale.language_changed, &main_keyboard())
            .await;
        if let Err(e) = self
            .transport
            .delete_message(chat_id, selection.message_id)
            .await
        {
            debug!(chat_id = %chat_id, error = %e, "Failed to delete language selection");
        }

        HandleOutcome::LanguageChanged(language)
    }

    async fn handle_text(&self, chat_id: ChatId, text: &str, locale: &Locale) -> HandleOutcome {
        match normalize_command(text) {
            "/start" => {
                self.reply(chat_id, locale.start, &main_keyboard()).await;
            }
            "/language" | "/lang" | LANGUAGE_BUTTON => {
                self.reply(chat_id, locale.select_language, &language_keyboard())
                    .await;
            }
            "/help" | HELP_BUTTON => {
                self.reply(chat_id, &locale.help_text(), &main_keyboard())
                    .await;
            }
            _ => return HandleOutcome::Ignored,
        }
        HandleOutcome::Replied
    }

    async fn handle_document(&self, message: &Message, locale: &Locale) -> HandleOutcome {
        let Some(document) = &message.document else {
            return HandleOutcome::Ignored;
        };

        if is_video_document(document.mime_type.as_deref(), document.file_name.as_deref()) {
            self.submit_video(message.chat.id, message.message_id, &document.file_id, locale)
                .await
        } else {
            debug!(
                chat_id = %message.chat.id,
                mime_type = ?document.mime_type,
                file_name = ?document.file_name,
                "Rejected non-video document"
            );
            self.reply(message.chat.id, locale.send_video, &main_keyboard())
                .await;
            HandleOutcome::NotVideo
        }
    }

    /// Post the status placeholder, then queue the conversion.
    async fn submit_video(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        file_id: &str,
        locale: &Locale,
    ) -> HandleOutcome {
        let position = self.dispatcher.scheduler().preview();
        let status_text = locale.queue_position(position);

        let status = match self.transport.send_status(chat_id, &status_text).await {
            Ok(status) => status,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Failed to send status message, dropping video");
                return HandleOutcome::Dropped;
            }
        };

        let request = TaskRequest::new(chat_id, message_id, SourceRef::new(file_id), status);
        let admission = self.dispatcher.submit(request);
        info!(
            chat_id = %chat_id,
            task_id = %admission.task().id(),
            preview = position,
            admitted = admission.is_admitted(),
            "Video submitted"
        );
        HandleOutcome::Submitted(admission)
    }

    async fn reply(&self, chat_id: ChatId, text: &str, markup: &crate::telegram::ReplyMarkup) {
        if let Err(e) = self.transport.send_message(chat_id, text, Some(markup)).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_mime_types() {
        assert!(is_video_document(Some("video/mp4"), None));
        assert!(is_video_document(Some("video/quicktime"), Some("clip")));
        assert!(is_video_document(Some("VIDEO/WEBM"), None));
        assert!(!is_video_document(Some("image/gif"), None));
        assert!(!is_video_document(None, None));
    }

    #[test]
    fn test_video_extension_fallback() {
        assert!(is_video_document(None, Some("clip.MOV")));
        assert!(is_video_document(Some("application/octet-stream"), Some("a.flv")));
        assert!(is_video_document(Some(""), Some("b.mkv")));
        assert!(!is_video_document(Some("application/pdf"), Some("doc.pdf")));
        assert!(!is_video_document(None, Some("mp4")));
    }

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("/start@gif_bot"), "/start");
        assert_eq!(normalize_command("  /help "), "/help");
        assert_eq!(normalize_command(LANGUAGE_BUTTON), LANGUAGE_BUTTON);
        assert_eq!(normalize_command("mail me@example.com"), "mail me@example.com");
    }
}
