//! Bounded conversion scheduling.
//!
//! The [`Scheduler`] decides which tasks run and which wait, the
//! [`Dispatcher`] drives admitted tasks through the conversion pipeline and
//! promotes the next waiting task when one finishes, and the
//! [`StatusReporter`] keeps waiting requesters informed of their place in
//! line.

mod dispatcher;
mod queue;
mod reporter;
mod task;

pub use dispatcher::{DispatchEvent, Dispatcher, TaskFinished, TaskOutcome};
pub use queue::{Admission, Scheduler, preview_position};
pub use reporter::{StatusReporter, TickReport};
pub use task::{ChatId, MessageId, SourceRef, StatusRef, Task, TaskId, TaskRequest};
