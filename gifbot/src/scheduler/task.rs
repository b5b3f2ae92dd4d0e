//! Conversion task definitions.
//!
//! A task is one video waiting for, or undergoing, GIF conversion. The
//! scheduler owns the authoritative copy; everyone else works on clones.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned by the scheduler at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat identifier of the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram message identifier, used both for the requester's original
/// message and for the bot's status placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to the status placeholder message shown to the requester.
pub type StatusRef = MessageId;

/// Handle to the remote source file (a Telegram `file_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self(file_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A task as built by intake, before the scheduler numbers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub source: SourceRef,
    pub status: StatusRef,
}

impl TaskRequest {
    pub fn new(chat_id: ChatId, message_id: MessageId, source: SourceRef, status: StatusRef) -> Self {
        Self {
            chat_id,
            message_id,
            source,
            status,
        }
    }
}

/// A numbered task tracked by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    chat_id: ChatId,
    message_id: MessageId,
    source: SourceRef,
    status: StatusRef,
    queue_position: usize,
}

impl Task {
    pub(super) fn from_request(id: TaskId, request: TaskRequest) -> Self {
        Self {
            id,
            chat_id: request.chat_id,
            message_id: request.message_id,
            source: request.source,
            status: request.status,
            queue_position: 0,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// The requester's original message carrying the video.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn status(&self) -> StatusRef {
        self.status
    }

    /// `0` while running, otherwise the 1-based rank among waiting tasks.
    ///
    /// This is the value at the moment the copy was taken.
    pub fn queue_position(&self) -> usize {
        self.queue_position
    }

    pub fn is_running(&self) -> bool {
        self.queue_position == 0
    }

    pub(super) fn set_queue_position(&mut self, position: usize) {
        self.queue_position = position;
    }
}
