//! Telegram Bot API client.
//!
//! Every method is a `POST {api_url}/bot<token>/<method>`. Rate limits (429)
//! are retried after the `parameters.retry_after` delay the API returns.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use tracing::{debug, warn};

use super::Transport;
use super::types::{ApiResponse, File, Message, ReplyMarkup, Update, User};
use crate::scheduler::{ChatId, MessageId, SourceRef};
use crate::utils::http_client::install_rustls_provider;
use crate::{Error, Result};

/// Maximum number of retries for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Timeout for ordinary API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for animation uploads.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Slack added on top of the long-poll timeout.
const POLL_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// Default Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Bot API client bound to one bot token.
#[derive(Clone)]
pub struct TelegramBot {
    client: Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TelegramBot {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        install_rustls_provider();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, api_url, token))
    }

    pub fn with_client(client: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Shared HTTP client, also used to download source files.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Download URL for a `file_path` returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    /// Call a method with a JSON payload.
    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &serde_json::Value) -> Result<T> {
        let url = self.method_url(method);
        self.execute(method, || {
            self.client.post(&url).json(payload).timeout(REQUEST_TIMEOUT)
        })
        .await
    }

    /// Send a request with rate limit handling.
    ///
    /// `build` is invoked once per attempt so non-cloneable bodies (multipart)
    /// can be rebuilt.
    async fn execute<T, F>(&self, method: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            // Request URLs embed the token; keep it out of error messages.
            let response = build().send().await.map_err(reqwest::Error::without_url)?;
            let status = response.status();
            let body = response.text().await.map_err(reqwest::Error::without_url)?;

            let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| {
                Error::telegram(method, format!("HTTP {}: {}", status, truncate(&body, 200)))
            })?;

            if parsed.ok {
                return parsed
                    .result
                    .ok_or_else(|| Error::telegram(method, "response without result"));
            }

            if parsed.error_code == Some(429) || status.as_u16() == 429 {
                let retry_after = Duration::from_secs(
                    parsed
                        .parameters
                        .as_ref()
                        .and_then(|p| p.retry_after)
                        .unwrap_or(1),
                );

                if attempts >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        method,
                        retries = MAX_RATE_LIMIT_RETRIES,
                        ?retry_after,
                        "Telegram rate limit: max retries exceeded"
                    );
                    return Err(Error::RateLimited {
                        method: method.to_string(),
                        retry_after,
                    });
                }

                debug!(
                    method,
                    attempt = attempts,
                    ?retry_after,
                    "Telegram rate limited (429), waiting before retry"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            let description = parsed
                .description
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(Error::telegram(method, description));
        }
    }

    /// Identity of the bot; doubles as a token check at startup.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for updates with an id of at least `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let url = self.method_url("getUpdates");
        let payload = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        let timeout = Duration::from_secs(timeout_secs) + POLL_TIMEOUT_SLACK;
        self.execute("getUpdates", || {
            self.client.post(&url).json(&payload).timeout(timeout)
        })
        .await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }
}

#[async_trait]
impl Transport for TelegramBot {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<MessageId> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        let message: Message = self.call("sendMessage", &payload).await?;
        Ok(message.message_id)
    }

    async fn edit_message(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        match self.call::<IgnoredAny>("editMessageText", &payload).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_modified() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        let payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });
        self.call::<IgnoredAny>("deleteMessage", &payload).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.call::<IgnoredAny>("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }

    async fn fetch_source_location(&self, source: &SourceRef) -> Result<String> {
        let file = self.get_file(source.as_str()).await?;
        let path = file
            .file_path
            .ok_or_else(|| Error::telegram("getFile", "file has no download path"))?;
        Ok(self.file_url(&path))
    }

    async fn send_animation(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<MessageId> {
        let data = tokio::fs::read(path).await?;
        let url = self.method_url("sendAnimation");

        let message: Message = self
            .execute("sendAnimation", || {
                let part = Part::bytes(data.clone()).file_name("animation.gif");
                let form = Form::new()
                    .text("chat_id", chat_id.to_string())
                    .text("caption", caption.to_string())
                    .part("animation", part);
                self.client.post(&url).multipart(form).timeout(UPLOAD_TIMEOUT)
            })
            .await?;

        debug!(chat_id = %chat_id, bytes = data.len(), "Animation sent");
        Ok(message.message_id)
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot() -> TelegramBot {
        TelegramBot::new("https://api.telegram.org/", "123:ABC").unwrap()
    }

    #[test]
    fn test_method_url() {
        assert_eq!(
            bot().method_url("sendMessage"),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn test_file_url() {
        assert_eq!(
            bot().file_url("videos/file_1.mp4"),
            "https://api.telegram.org/file/bot123:ABC/videos/file_1.mp4"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", bot());
        assert!(!debug.contains("123:ABC"));
    }

    #[tokio::test]
    async fn test_request_error_hides_token() {
        let bot = TelegramBot::new("http://127.0.0.1:9", "123456:SECRET_TOKEN").unwrap();
        let err = bot.get_me().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(!err.to_string().contains("SECRET_TOKEN"));
        assert!(!format!("{:?}", err).contains("SECRET_TOKEN"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
