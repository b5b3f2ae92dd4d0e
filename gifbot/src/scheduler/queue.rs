//! Bounded-concurrency processing queue.
//!
//! The [`Scheduler`] decides whether a submitted task may start right away or
//! has to wait, keeps waiting tasks numbered in arrival order, and promotes the
//! head of the line whenever a running task completes.
//!
//! All state lives behind a single [`parking_lot::Mutex`]. Every operation is a
//! short critical section; callers perform their I/O after the lock is
//! released, working on the copies returned here.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::task::{Task, TaskId, TaskRequest};
use crate::{Error, Result};

/// Outcome of [`Scheduler::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A slot was free; the caller must dispatch the task now.
    Started(Task),
    /// All slots are busy; the task waits for promotion.
    Queued(Task),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    pub fn task(&self) -> &Task {
        match self {
            Self::Started(task) | Self::Queued(task) => task,
        }
    }

    pub fn into_task(self) -> Task {
        match self {
            Self::Started(task) | Self::Queued(task) => task,
        }
    }
}

struct QueueState {
    running: HashMap<TaskId, Task>,
    waiting: VecDeque<Task>,
    next_id: u64,
}

impl QueueState {
    fn new() -> Self {
        Self {
            running: HashMap::new(),
            waiting: VecDeque::new(),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn renumber(&mut self) {
        for (index, task) in self.waiting.iter_mut().enumerate() {
            task.set_queue_position(index + 1);
        }
    }
}

/// The processing queue shared by intake, the dispatcher and the status reporter.
pub struct Scheduler {
    capacity: NonZeroUsize,
    state: Mutex<QueueState>,
}

impl Scheduler {
    /// Create a scheduler allowing `capacity` tasks to run at once.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState::new()),
        }
    }

    /// Create a scheduler from a plain count, rejecting zero.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or_else(|| Error::config("scheduler capacity must be at least 1"))
    }

    /// Number the request and either admit it or append it to the waiting line.
    pub fn submit(&self, request: TaskRequest) -> Admission {
        let admission = {
            let mut state = self.state.lock();
            let id = state.next_id();
            let mut task = Task::from_request(id, request);

            if state.running.len() < self.capacity.get() {
                task.set_queue_position(0);
                state.running.insert(id, task.clone());
                Admission::Started(task)
            } else {
                state.waiting.push_back(task.clone());
                let position = state.waiting.len();
                task.set_queue_position(position);
                if let Some(queued) = state.waiting.back_mut() {
                    queued.set_queue_position(position);
                }
                Admission::Queued(task)
            }
        };

        let task = admission.task();
        debug!(
            task_id = %task.id(),
            chat_id = %task.chat_id(),
            admitted = admission.is_admitted(),
            position = task.queue_position(),
            "Task submitted"
        );
        admission
    }

    /// Release the slot held by `id` and promote the head of the waiting line.
    ///
    /// Completing an id that is not running is a no-op: nothing is promoted,
    /// so late or duplicate completions can never over-fill the running set.
    pub fn complete(&self, id: TaskId) -> Option<Task> {
        let (promoted, waiting) = {
            let mut state = self.state.lock();
            if state.running.remove(&id).is_none() {
                drop(state);
                trace!(task_id = %id, "Ignoring completion of a task that is not running");
                return None;
            }

            let promoted = match state.waiting.pop_front() {
                Some(mut next) => {
                    next.set_queue_position(0);
                    state.running.insert(next.id(), next.clone());
                    Some(next)
                }
                None => None,
            };
            state.renumber();

            debug_assert!(state.running.len() <= self.capacity.get());
            (promoted, state.waiting.len())
        };

        match &promoted {
            Some(next) => debug!(
                task_id = %id,
                promoted = %next.id(),
                waiting,
                "Task completed, promoted next in line"
            ),
            None => debug!(task_id = %id, "Task completed, queue empty"),
        }
        promoted
    }

    /// Point-in-time copy of the waiting line, head first.
    pub fn snapshot(&self) -> Vec<Task> {
        self.state.lock().waiting.iter().cloned().collect()
    }

    /// Number of running tasks.
    pub fn active_count(&self) -> usize {
        self.state.lock().running.len()
    }

    /// Number of running plus waiting tasks.
    pub fn total_count(&self) -> usize {
        let state = self.state.lock();
        state.running.len() + state.waiting.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Current position of a task: `Some(0)` while running, the 1-based rank
    /// while waiting, `None` once completed or if never submitted.
    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        let state = self.state.lock();
        if state.running.contains_key(&id) {
            return Some(0);
        }
        state
            .waiting
            .iter()
            .find(|task| task.id() == id)
            .map(Task::queue_position)
    }

    /// Position a request submitted right now would get.
    ///
    /// Advisory only: another submission may land before the real one.
    pub fn preview(&self) -> usize {
        let state = self.state.lock();
        preview_position(
            state.running.len(),
            state.running.len() + state.waiting.len(),
            self.capacity.get(),
        )
    }
}

/// Compute the admission preview from the active and total counts.
pub fn preview_position(active: usize, total: usize, capacity: usize) -> usize {
    if active < capacity {
        0
    } else {
        total.saturating_sub(active) + 1
    }
}
