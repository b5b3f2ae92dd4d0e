//! Periodic queue-position updates for waiting requesters.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::queue::Scheduler;
use super::task::Task;
use crate::locale::LocaleService;
use crate::telegram::Transport;

/// Upper bound on placeholder edits in flight during one tick.
const MAX_CONCURRENT_UPDATES: usize = 8;

/// Result of a single reporter tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub updated: usize,
    pub failed: usize,
}

/// Pushes the current queue position to every waiting task's status message.
pub struct StatusReporter {
    scheduler: Arc<Scheduler>,
    transport: Arc<dyn Transport>,
    locales: Arc<LocaleService>,
    interval: Duration,
}

impl StatusReporter {
    pub fn new(
        scheduler: Arc<Scheduler>,
        transport: Arc<dyn Transport>,
        locales: Arc<LocaleService>,
        interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            transport,
            locales,
            interval,
        }
    }

    /// Spawn the reporter loop; it runs until `token` is cancelled.
    pub fn start(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }

    pub async fn run(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval = ?self.interval, "Status reporter started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Status reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Refresh every waiting placeholder once.
    ///
    /// The scheduler lock is only held while the snapshot is taken. Each edit
    /// is independent; a failed one is logged and skipped.
    pub async fn tick(&self) -> TickReport {
        let waiting = self.scheduler.snapshot();
        if waiting.is_empty() {
            return TickReport::default();
        }

        let results: Vec<bool> = futures::stream::iter(waiting)
            .map(|task| self.update_one(task))
            .buffer_unordered(MAX_CONCURRENT_UPDATES)
            .collect()
            .await;

        let updated = results.iter().filter(|ok| **ok).count();
        let report = TickReport {
            updated,
            failed: results.len() - updated,
        };
        trace!(updated = report.updated, failed = report.failed, "Status tick done");
        report
    }

    async fn update_one(&self, task: Task) -> bool {
        let locale = self.locales.locale_for(task.chat_id());
        let text = locale.queue_position(task.queue_position());

        match self
            .transport
            .update_status(task.chat_id(), task.status(), &text)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    task_id = %task.id(),
                    chat_id = %task.chat_id(),
                    error = %e,
                    "Failed to update queue status"
                );
                false
            }
        }
    }
}
