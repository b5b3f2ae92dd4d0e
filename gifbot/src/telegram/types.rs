//! Bot API objects, limited to the fields the bot reads or sends.

use serde::{Deserialize, Serialize};

use crate::scheduler::{ChatId, MessageId};

/// Envelope returned by every Bot API method.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub chat: Chat,
    pub text: Option<String>,
    pub video: Option<Video>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub duration: Option<u64>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Result of `getFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// `reply_markup` parameter of `sendMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Inline(InlineKeyboardMarkup),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_video_update() {
        let json = r#"{
            "update_id": 1001,
            "message": {
                "message_id": 55,
                "date": 1700000000,
                "chat": {"id": -100123, "type": "private"},
                "video": {"file_id": "BAAD", "file_unique_id": "u1", "width": 640, "height": 360, "duration": 12, "mime_type": "video/mp4"}
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        assert_eq!(update.update_id, 1001);
        assert_eq!(message.message_id, MessageId(55));
        assert_eq!(message.chat.id, ChatId(-100123));
        assert_eq!(message.video.unwrap().file_id, "BAAD");
        assert!(message.text.is_none());
    }

    #[test]
    fn test_decode_callback_update() {
        let json = r#"{
            "update_id": 7,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 9, "is_bot": false, "first_name": "Ann"},
                "message": {"message_id": 3, "chat": {"id": 9}, "text": "Select language"},
                "data": "lang_en"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let callback = update.callback_query.unwrap();
        assert_eq!(callback.id, "cb-1");
        assert_eq!(callback.data.as_deref(), Some("lang_en"));
        assert_eq!(callback.message.unwrap().message_id, MessageId(3));
    }

    #[test]
    fn test_decode_error_response() {
        let json = r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 5", "parameters": {"retry_after": 5}}"#;
        let response: ApiResponse<Message> = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert_eq!(response.error_code, Some(429));
        assert_eq!(response.parameters.unwrap().retry_after, Some(5));
    }

    #[test]
    fn test_reply_markup_shape() {
        let markup = ReplyMarkup::Inline(InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: "English".into(),
                callback_data: "lang_en".into(),
            }]],
        });
        let value = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            value["inline_keyboard"][0][0]["callback_data"],
            serde_json::json!("lang_en")
        );
    }
}
