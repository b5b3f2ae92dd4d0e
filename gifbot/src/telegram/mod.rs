//! Telegram messaging.
//!
//! Components talk to the chat through the [`Transport`] trait; the
//! [`TelegramBot`] client implements it over the Bot API.

mod client;
pub mod keyboard;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

use crate::Result;
use crate::scheduler::{ChatId, MessageId, SourceRef, StatusRef};

pub use client::{DEFAULT_API_URL, TelegramBot};
pub use types::{CallbackQuery, Message, ReplyMarkup, Update};

/// Outbound messaging operations.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<MessageId>;

    /// Replace the text of a message sent by the bot.
    ///
    /// Setting the text it already has succeeds.
    async fn edit_message(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str) -> Result<()>;

    /// Resolve a source handle into a URL the file can be downloaded from.
    async fn fetch_source_location(&self, source: &SourceRef) -> Result<String>;

    async fn send_animation(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<MessageId>;

    /// Post a status placeholder.
    async fn send_status(&self, chat_id: ChatId, text: &str) -> Result<StatusRef> {
        self.send_message(chat_id, text, None).await
    }

    async fn update_status(&self, chat_id: ChatId, status: StatusRef, text: &str) -> Result<()> {
        self.edit_message(chat_id, status, text).await
    }

    async fn delete_status(&self, chat_id: ChatId, status: StatusRef) -> Result<()> {
        self.delete_message(chat_id, status).await
    }
}
