//! Dispatcher: runs the conversion pipeline for admitted tasks.
//!
//! Every task the [`Scheduler`] admits or promotes is launched here as its own
//! tokio task. When a pipeline run ends, whatever the outcome, a
//! [`TaskFinished`] event is handled by [`Dispatcher::on_task_finished`], the
//! single place that releases the slot and relaunches the promoted task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::queue::{Admission, Scheduler};
use super::task::{ChatId, Task, TaskId, TaskRequest};
use crate::pipeline::ConversionPipeline;

/// Default event channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    /// The pipeline panicked or its tokio task was aborted.
    Aborted(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Completion event for one pipeline run.
#[derive(Debug, Clone)]
pub struct TaskFinished {
    pub task: Task,
    pub outcome: TaskOutcome,
    pub elapsed: Duration,
}

/// Events emitted by the dispatcher.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// Task entered the waiting line.
    Queued {
        task_id: TaskId,
        chat_id: ChatId,
        position: usize,
    },
    /// Pipeline launched for the task (on admission or promotion).
    Started { task_id: TaskId, chat_id: ChatId },
    /// Pipeline run ended and the slot was released.
    Finished {
        task_id: TaskId,
        chat_id: ChatId,
        outcome: TaskOutcome,
        duration_secs: f64,
    },
    /// A waiting task took the slot released by `after`.
    Promoted { task_id: TaskId, after: TaskId },
}

/// Launches pipelines for admitted tasks and reacts to their completion.
pub struct Dispatcher {
    scheduler: Arc<Scheduler>,
    pipeline: Arc<dyn ConversionPipeline>,
    tracker: TaskTracker,
    event_tx: broadcast::Sender<DispatchEvent>,
}

impl Dispatcher {
    pub fn new(scheduler: Arc<Scheduler>, pipeline: Arc<dyn ConversionPipeline>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Arc::new(Self {
            scheduler,
            pipeline,
            tracker: TaskTracker::new(),
            event_tx,
        })
    }

    /// Submit a request to the scheduler and launch it if a slot was free.
    ///
    /// Never blocks on the pipeline itself.
    pub fn submit(self: &Arc<Self>, request: TaskRequest) -> Admission {
        let admission = self.scheduler.submit(request);
        match &admission {
            Admission::Started(task) => self.launch(task.clone()),
            Admission::Queued(task) => {
                info!(
                    task_id = %task.id(),
                    chat_id = %task.chat_id(),
                    position = task.queue_position(),
                    "Task queued"
                );
                self.emit(DispatchEvent::Queued {
                    task_id: task.id(),
                    chat_id: task.chat_id(),
                    position: task.queue_position(),
                });
            }
        }
        admission
    }

    fn launch(self: &Arc<Self>, task: Task) {
        info!(task_id = %task.id(), chat_id = %task.chat_id(), "Starting conversion");
        self.emit(DispatchEvent::Started {
            task_id: task.id(),
            chat_id: task.chat_id(),
        });

        let this = Arc::clone(self);
        self.tracker.spawn(async move {
            let finished = this.run_pipeline(task).await;
            this.on_task_finished(finished);
        });
    }

    async fn run_pipeline(&self, task: Task) -> TaskFinished {
        let start = Instant::now();
        let pipeline = Arc::clone(&self.pipeline);
        let job = task.clone();

        // Run on a separate tokio task so a panic surfaces as a JoinError
        // instead of skipping the completion below.
        let outcome = match tokio::spawn(async move { pipeline.run(&job).await }).await {
            Ok(Ok(())) => TaskOutcome::Succeeded,
            Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
            Err(e) => TaskOutcome::Aborted(e.to_string()),
        };

        TaskFinished {
            task,
            outcome,
            elapsed: start.elapsed(),
        }
    }

    /// Release the finished task's slot and launch whoever was promoted into it.
    pub fn on_task_finished(self: &Arc<Self>, event: TaskFinished) {
        let task_id = event.task.id();
        let duration_secs = event.elapsed.as_secs_f64();

        match &event.outcome {
            TaskOutcome::Succeeded => {
                info!(task_id = %task_id, duration_secs, "Conversion finished")
            }
            TaskOutcome::Failed(reason) => {
                warn!(task_id = %task_id, duration_secs, error = %reason, "Conversion failed")
            }
            TaskOutcome::Aborted(reason) => {
                error!(task_id = %task_id, duration_secs, error = %reason, "Conversion aborted")
            }
        }

        let promoted = self.scheduler.complete(task_id);
        self.emit(DispatchEvent::Finished {
            task_id,
            chat_id: event.task.chat_id(),
            outcome: event.outcome,
            duration_secs,
        });

        if let Some(next) = promoted {
            self.emit(DispatchEvent::Promoted {
                task_id: next.id(),
                after: task_id,
            });
            self.launch(next);
        }
    }

    fn emit(&self, event: DispatchEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to dispatch events.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.event_tx.subscribe()
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Number of pipeline runs currently in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for in-flight pipelines (and anything they promote) to finish.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        debug!(in_flight = self.tracker.len(), "Draining dispatcher");

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                info!("Dispatcher drained");
                true
            }
            Err(_) => {
                warn!(
                    in_flight = self.tracker.len(),
                    waiting = self
                        .scheduler
                        .total_count()
                        .saturating_sub(self.scheduler.active_count()),
                    "Dispatcher shutdown timed out"
                );
                false
            }
        }
    }
}
