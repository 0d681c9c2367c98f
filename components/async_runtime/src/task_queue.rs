//! Task and microtask queue management.
//!
//! Tasks are executed one per event-loop turn; the microtask queue is drained
//! completely after each task and after each animation-frame callback.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Identifies a future spawned on the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

/// Where a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSource {
    /// A timer whose deadline has passed
    Timer,
    /// A message delivered to a message port
    PostedMessage,
    /// Anything queued directly with `enqueue_task`
    Generic,
}

/// A task to be executed by the event loop.
///
/// Tasks represent one turn's worth of work, e.g. a timer callback or a
/// message delivery.
pub struct Task {
    source: TaskSource,
    callback: Box<dyn FnOnce()>,
}

impl Task {
    /// Creates a new Task from a closure.
    pub fn new<F>(source: TaskSource, f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            source,
            callback: Box::new(f),
        }
    }

    /// The task source this task was queued from.
    pub fn source(&self) -> TaskSource {
        self.source
    }

    /// Executes the task.
    pub fn run(self) {
        (self.callback)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {{ source: {:?}, .. }}", self.source)
    }
}

/// A queue for tasks.
///
/// Tasks are processed in FIFO order, one at a time.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the next task from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of tasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A queue of spawned futures that are ready to be polled.
///
/// Wakers must be `Send + Sync`, so the queue lives behind a mutex and is
/// shared between the event loop and every waker it hands out. Polling order
/// is FIFO, which makes a wake equivalent to queueing a microtask.
#[derive(Debug, Clone, Default)]
pub struct MicrotaskQueue {
    queue: Arc<Mutex<VecDeque<TaskId>>>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ready task to the end of the queue.
    pub fn enqueue(&self, id: TaskId) {
        self.queue.lock().push_back(id);
    }

    /// Removes and returns the next ready task.
    pub fn dequeue(&self) -> Option<TaskId> {
        self.queue.lock().pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Returns the number of queued microtasks.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }
}
