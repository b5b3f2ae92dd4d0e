//! In-memory fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gifbot::bot::UpdateSource;
use gifbot::pipeline::ConversionPipeline;
use gifbot::scheduler::{ChatId, DispatchEvent, MessageId, SourceRef, Task};
use gifbot::telegram::{ReplyMarkup, Transport, Update};
use gifbot::{Error, Result};
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

/// A message the fake transport was asked to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

/// Records every outbound call; sends and edits can be made to fail.
#[derive(Default)]
pub struct FakeTransport {
    next_id: AtomicI64,
    pub sent: Mutex<Vec<Sent>>,
    pub edits: Mutex<Vec<(ChatId, MessageId, String)>>,
    pub deleted: Mutex<Vec<(ChatId, MessageId)>>,
    pub answered: Mutex<Vec<String>>,
    pub fail_sends: Mutex<bool>,
    pub fail_edits_for: Mutex<HashSet<ChatId>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        })
    }

    pub fn sent_to(&self, chat_id: ChatId) -> Vec<Sent> {
        self.sent
            .lock()
            .iter()
            .filter(|s| s.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn edits_to(&self, chat_id: ChatId) -> Vec<String> {
        self.edits
            .lock()
            .iter()
            .filter(|(chat, _, _)| *chat == chat_id)
            .map(|(_, _, text)| text.clone())
            .collect()
    }

    pub fn clear_edits(&self) {
        self.edits.lock().clear();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<MessageId> {
        if *self.fail_sends.lock() {
            return Err(Error::telegram("sendMessage", "Forbidden: bot was blocked by the user"));
        }
        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().push(Sent {
            chat_id,
            message_id,
            text: text.to_string(),
            markup: markup.cloned(),
        });
        Ok(message_id)
    }

    async fn edit_message(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        if self.fail_edits_for.lock().contains(&chat_id) {
            return Err(Error::telegram("editMessageText", "Bad Request: message to edit not found"));
        }
        self.edits
            .lock()
            .push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.deleted.lock().push((chat_id, message_id));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.answered.lock().push(callback_id.to_string());
        Ok(())
    }

    async fn fetch_source_location(&self, source: &SourceRef) -> Result<String> {
        Ok(format!("memory://{}", source))
    }

    async fn send_animation(&self, _chat_id: ChatId, _path: &Path, _caption: &str) -> Result<MessageId> {
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Pipeline whose runs block until the test releases them, per chat.
#[derive(Default)]
pub struct GatedPipeline {
    gates: Mutex<HashMap<ChatId, Arc<Notify>>>,
    pub started: Mutex<Vec<ChatId>>,
}

impl GatedPipeline {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn gate(&self, chat_id: ChatId) -> Arc<Notify> {
        self.gates
            .lock()
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Let the run for `chat_id` finish, now or as soon as it starts.
    pub fn release(&self, chat_id: ChatId) {
        self.gate(chat_id).notify_one();
    }

    pub fn started(&self) -> Vec<ChatId> {
        self.started.lock().clone()
    }
}

#[async_trait]
impl ConversionPipeline for GatedPipeline {
    async fn run(&self, task: &Task) -> Result<()> {
        self.started.lock().push(task.chat_id());
        let gate = self.gate(task.chat_id());
        gate.notified().await;
        Ok(())
    }
}

/// Update source replaying scripted batches, then waiting forever.
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Vec<Update>>>,
    pub offsets: Mutex<Vec<Option<i64>>>,
    pub drained: Notify,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<Update>>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
            offsets: Mutex::new(Vec::new()),
            drained: Notify::new(),
        })
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn poll(&self, offset: Option<i64>, _timeout_secs: u64) -> Result<Vec<Update>> {
        self.offsets.lock().push(offset);
        let next = self.batches.lock().pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => {
                self.drained.notify_one();
                std::future::pending().await
            }
        }
    }
}

pub fn update(json: serde_json::Value) -> Update {
    serde_json::from_value(json).expect("valid update json")
}

pub fn video_update(update_id: i64, chat: i64, message_id: i64) -> Update {
    update(serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "chat": {"id": chat},
            "video": {"file_id": format!("video-{}-{}", chat, message_id)}
        }
    }))
}

pub fn text_update(update_id: i64, chat: i64, text: &str) -> Update {
    update(serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "chat": {"id": chat},
            "text": text
        }
    }))
}

pub fn document_update(update_id: i64, chat: i64, mime: &str, file_name: &str) -> Update {
    update(serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "chat": {"id": chat},
            "document": {"file_id": "doc-file", "mime_type": mime, "file_name": file_name}
        }
    }))
}

pub fn callback_update(update_id: i64, chat: i64, data: &str, message_id: i64) -> Update {
    update(serde_json::json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb-{}", update_id),
            "from": {"id": chat, "first_name": "Tester"},
            "message": {"message_id": message_id, "chat": {"id": chat}},
            "data": data
        }
    }))
}

/// Wait for the first dispatch event matching `pred`.
pub async fn wait_for_event<F>(rx: &mut broadcast::Receiver<DispatchEvent>, mut pred: F) -> DispatchEvent
where
    F: FnMut(&DispatchEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event channel closed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for dispatch event")
}
