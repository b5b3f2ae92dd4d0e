//! Long-polling loop feeding updates to the handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handler::UpdateHandler;
use crate::telegram::{TelegramBot, Update};
use crate::{Error, Result};

/// Pause after a failed poll.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Source of incoming updates.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetch updates with an id of at least `offset`, waiting up to
    /// `timeout_secs` for one to arrive.
    async fn poll(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>>;
}

#[async_trait]
impl UpdateSource for TelegramBot {
    async fn poll(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        self.get_updates(offset, timeout_secs).await
    }
}

/// Polls for updates and hands them to the handler one at a time, in order.
pub struct UpdatePoller {
    source: Arc<dyn UpdateSource>,
    handler: Arc<UpdateHandler>,
    poll_timeout_secs: u64,
}

impl UpdatePoller {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        handler: Arc<UpdateHandler>,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            source,
            handler,
            poll_timeout_secs,
        }
    }

    /// Run until `token` is cancelled. Returns the number of updates handled.
    pub async fn run(&self, token: CancellationToken) -> u64 {
        let mut offset: Option<i64> = None;
        let mut handled: u64 = 0;
        info!(timeout_secs = self.poll_timeout_secs, "Polling for updates");

        loop {
            let polled = tokio::select! {
                _ = token.cancelled() => break,
                polled = self.source.poll(offset, self.poll_timeout_secs) => polled,
            };

            match polled {
                Ok(updates) => {
                    if !updates.is_empty() {
                        debug!(count = updates.len(), "Received updates");
                    }
                    for update in updates {
                        offset = Some(next_offset(offset, update.update_id));
                        let outcome = self.handler.handle(update).await;
                        debug!(?outcome, "Update handled");
                        handled += 1;
                    }
                }
                Err(e) => {
                    let backoff = match &e {
                        Error::RateLimited { retry_after, .. } => *retry_after,
                        _ => ERROR_BACKOFF,
                    };
                    warn!(error = %e, ?backoff, "Failed to fetch updates");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        info!(handled, "Update polling stopped");
        handled
    }
}

/// Offset that acknowledges `update_id` and everything before it.
fn next_offset(current: Option<i64>, update_id: i64) -> i64 {
    current.map_or(update_id + 1, |offset| offset.max(update_id + 1))
}
