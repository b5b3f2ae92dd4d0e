//! Telegram intake.

mod handler;
mod poller;

pub use handler::{HandleOutcome, UpdateHandler, is_video_document};
pub use poller::{UpdatePoller, UpdateSource};
