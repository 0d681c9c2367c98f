//! Event loop implementation.
//!
//! This module provides the single-threaded host event loop that the
//! step-timing core schedules against. It models the parts of a browser event
//! loop whose ordering matters for timing: a task queue, a microtask queue,
//! timers, and animation-frame callbacks delivered on a vsync grid.
//!
//! Each turn of the loop:
//! 1. Moves timers whose deadline has passed onto the task queue
//! 2. Takes the oldest task and executes it, then drains all microtasks
//! 3. If a frame is due and callbacks are pending, runs a rendering update:
//!    every callback registered before the update, each followed by a
//!    microtask checkpoint
//!
//! When nothing is runnable the loop sleeps until the next timer deadline or
//! frame boundary.

use crate::promise::{LocalFuture, Promise};
use crate::task_queue::{MicrotaskQueue, Task, TaskId, TaskQueue, TaskSource};
use core_types::{duration_from_ms, HarnessError, HarnessResult};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::time::{Duration, Instant};

/// Monotonic clock anchored at the host's time origin.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The instant all timestamps are relative to.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Milliseconds elapsed since the origin.
    pub fn now_ms(&self) -> f64 {
        self.ms_at(Instant::now())
    }

    /// Milliseconds between the origin and `instant`.
    pub fn ms_at(&self, instant: Instant) -> f64 {
        instant.saturating_duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Event loop settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLoopConfig {
    /// Distance between two rendering opportunities
    pub frame_interval: Duration,
}

impl EventLoopConfig {
    /// Creates a config with the given frame interval in milliseconds.
    pub fn with_frame_interval_ms(ms: f64) -> HarnessResult<Self> {
        Ok(Self {
            frame_interval: duration_from_ms("frameIntervalMs", ms)?,
        })
    }
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_secs_f64(1.0 / 60.0),
        }
    }
}

/// Handle returned by [`EventLoop::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Handle returned by [`EventLoop::request_animation_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

struct FrameRequest {
    id: FrameRequestId,
    callback: Box<dyn FnOnce(f64)>,
}

struct SpawnedTask {
    future: LocalFuture<()>,
    waker: Waker,
}

struct TaskWaker {
    id: TaskId,
    queue: MicrotaskQueue,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.queue.enqueue(self.id);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.enqueue(self.id);
    }
}

struct Inner {
    config: EventLoopConfig,
    clock: Clock,
    tasks: RefCell<TaskQueue>,
    microtasks: MicrotaskQueue,
    spawned: RefCell<HashMap<TaskId, SpawnedTask>>,
    timers: RefCell<BTreeMap<(Instant, u64), Task>>,
    frame_requests: RefCell<Vec<FrameRequest>>,
    next_frame_at: Cell<Instant>,
    frames_rendered: Cell<u64>,
    rendering_suppressed: Cell<bool>,
    next_id: Cell<u64>,
}

/// The host event loop.
///
/// `EventLoop` is a cheap, cloneable handle; every clone drives the same
/// queues. Callbacks capture clones to schedule further work.
///
/// # Examples
///
/// ```
/// use async_runtime::EventLoop;
/// use std::time::Duration;
///
/// let event_loop = EventLoop::new();
/// let el = event_loop.clone();
/// let promise = event_loop.spawn(async move {
///     el.delay(Duration::from_millis(1)).await;
///     el.animation_frame().await;
///     42
/// });
///
/// assert_eq!(event_loop.block_on(promise, None).unwrap(), 42);
/// ```
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<Inner>,
}

impl EventLoop {
    /// Creates a new EventLoop with the default 60Hz frame interval.
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Creates a new EventLoop with the given settings.
    pub fn with_config(config: EventLoopConfig) -> Self {
        let clock = Clock::new();
        Self {
            inner: Rc::new(Inner {
                config,
                clock,
                tasks: RefCell::new(TaskQueue::new()),
                microtasks: MicrotaskQueue::new(),
                spawned: RefCell::new(HashMap::new()),
                timers: RefCell::new(BTreeMap::new()),
                frame_requests: RefCell::new(Vec::new()),
                next_frame_at: Cell::new(clock.origin()),
                frames_rendered: Cell::new(0),
                rendering_suppressed: Cell::new(false),
                next_id: Cell::new(1),
            }),
        }
    }

    /// The loop's settings.
    pub fn config(&self) -> &EventLoopConfig {
        &self.inner.config
    }

    /// The loop's clock; frame timestamps are relative to its origin.
    pub fn clock(&self) -> Clock {
        self.inner.clock
    }

    /// Milliseconds since the loop's time origin.
    pub fn now_ms(&self) -> f64 {
        self.inner.clock.now_ms()
    }

    fn next_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    // ------------------------------------------------------------------
    // Tasks and microtasks
    // ------------------------------------------------------------------

    /// Adds a task to the task queue.
    ///
    /// The task will be executed in a later turn of the loop.
    pub fn enqueue_task<F>(&self, f: F)
    where
        F: FnOnce() + 'static,
    {
        self.push_task(Task::new(TaskSource::Generic, f));
    }

    pub(crate) fn push_task(&self, task: Task) {
        self.inner.tasks.borrow_mut().enqueue(task);
    }

    /// Adds a microtask to the microtask queue.
    ///
    /// The microtask runs at the next microtask checkpoint, after the current
    /// task or frame callback returns.
    pub fn queue_microtask<F>(&self, f: F)
    where
        F: FnOnce() + 'static,
    {
        let id = self.insert_spawned(Box::pin(async move { f() }));
        self.inner.microtasks.enqueue(id);
    }

    /// Spawns a future on the loop and returns a promise for its output.
    ///
    /// Like calling an async function, the future runs immediately until its
    /// first suspension point; every later poll happens at a microtask
    /// checkpoint after it is woken.
    pub fn spawn<F>(&self, future: F) -> Promise<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let (resolver, promise) = Promise::pending();
        let id = self.insert_spawned(Box::pin(async move {
            resolver.resolve(future.await);
        }));
        self.poll_spawned(id);
        promise
    }

    fn insert_spawned(&self, future: LocalFuture<()>) -> TaskId {
        let id = TaskId(self.next_id());
        let waker = Waker::from(Arc::new(TaskWaker {
            id,
            queue: self.inner.microtasks.clone(),
        }));
        self.inner
            .spawned
            .borrow_mut()
            .insert(id, SpawnedTask { future, waker });
        id
    }

    fn poll_spawned(&self, id: TaskId) {
        // The task is taken out of the map while it runs so that it can spawn
        // or wake other tasks without re-borrowing the map.
        let task = self.inner.spawned.borrow_mut().remove(&id);
        let Some(mut task) = task else {
            return;
        };
        let mut cx = Context::from_waker(&task.waker);
        if task.future.as_mut().poll(&mut cx).is_pending() {
            self.inner.spawned.borrow_mut().insert(id, task);
        }
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// Microtasks queued while draining are processed before this returns.
    pub fn perform_microtask_checkpoint(&self) {
        while let Some(id) = self.inner.microtasks.dequeue() {
            self.poll_spawned(id);
        }
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.inner.tasks.borrow().is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.inner.microtasks.is_empty()
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Runs `f` as a timer task once `delay` has elapsed.
    ///
    /// Timers with equal deadlines fire in the order they were set.
    pub fn set_timeout<F>(&self, delay: Duration, f: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        let id = self.next_id();
        let deadline = Instant::now() + delay;
        self.inner
            .timers
            .borrow_mut()
            .insert((deadline, id), Task::new(TaskSource::Timer, f));
        TimerId(id)
    }

    /// Cancels a timer that has not fired yet.
    pub fn clear_timeout(&self, id: TimerId) {
        self.inner
            .timers
            .borrow_mut()
            .retain(|(_, timer), _| *timer != id.0);
    }

    /// A promise that settles once `delay` has elapsed.
    pub fn delay(&self, delay: Duration) -> Promise<()> {
        let (resolver, promise) = Promise::pending();
        self.set_timeout(delay, move || resolver.resolve(()));
        promise
    }

    /// Number of timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    fn promote_due_timers(&self, now: Instant) {
        let due = {
            let mut timers = self.inner.timers.borrow_mut();
            let later = timers.split_off(&(now, u64::MAX));
            std::mem::replace(&mut *timers, later)
        };
        if due.is_empty() {
            return;
        }
        let mut tasks = self.inner.tasks.borrow_mut();
        for task in due.into_values() {
            tasks.enqueue(task);
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Runs `f` at the next rendering update with the frame's timestamp.
    pub fn request_animation_frame<F>(&self, f: F) -> FrameRequestId
    where
        F: FnOnce(f64) + 'static,
    {
        let id = FrameRequestId(self.next_id());
        self.inner.frame_requests.borrow_mut().push(FrameRequest {
            id,
            callback: Box::new(f),
        });
        id
    }

    /// Cancels a frame callback that has not run yet.
    pub fn cancel_animation_frame(&self, id: FrameRequestId) {
        self.inner
            .frame_requests
            .borrow_mut()
            .retain(|request| request.id != id);
    }

    /// A promise that settles with the timestamp of the next rendering update.
    pub fn animation_frame(&self) -> Promise<f64> {
        let (resolver, promise) = Promise::pending();
        self.request_animation_frame(move |timestamp| resolver.resolve(timestamp));
        promise
    }

    /// Stops (or resumes) delivering rendering updates, as for a page in a
    /// background tab.
    pub fn set_rendering_suppressed(&self, suppressed: bool) {
        self.inner.rendering_suppressed.set(suppressed);
    }

    /// Number of rendering updates run so far.
    pub fn frames_rendered(&self) -> u64 {
        self.inner.frames_rendered.get()
    }

    /// Number of frame callbacks waiting for the next rendering update.
    pub fn pending_frame_requests(&self) -> usize {
        self.inner.frame_requests.borrow().len()
    }

    fn frames_deliverable(&self) -> bool {
        !self.inner.rendering_suppressed.get() && !self.inner.frame_requests.borrow().is_empty()
    }

    fn next_vsync_after(&self, instant: Instant) -> Instant {
        let origin = self.inner.clock.origin();
        let interval = self.inner.config.frame_interval.as_nanos().max(1);
        let elapsed = instant.saturating_duration_since(origin).as_nanos();
        let ticks = elapsed / interval + 1;
        origin + Duration::from_nanos((ticks * interval) as u64)
    }

    fn update_rendering(&self, now: Instant) {
        let requests = std::mem::take(&mut *self.inner.frame_requests.borrow_mut());
        let timestamp = self.inner.clock.ms_at(now);
        let frame = self.inner.frames_rendered.get() + 1;
        self.inner.frames_rendered.set(frame);
        tracing::trace!(frame, callbacks = requests.len(), timestamp, "rendering update");

        for request in requests {
            (request.callback)(timestamp);
            self.perform_microtask_checkpoint();
        }
        self.inner.next_frame_at.set(self.next_vsync_after(now));
    }

    // ------------------------------------------------------------------
    // Driving the loop
    // ------------------------------------------------------------------

    /// Processes one turn: one task followed by all microtasks, then a
    /// rendering update if a frame is due.
    ///
    /// Returns true if any work ran.
    pub fn turn(&self) -> bool {
        self.promote_due_timers(Instant::now());

        let mut ran = false;
        let task = self.inner.tasks.borrow_mut().dequeue();
        if let Some(task) = task {
            tracing::trace!(source = ?task.source(), "running task");
            task.run();
            self.perform_microtask_checkpoint();
            ran = true;
        }

        let now = Instant::now();
        if self.frames_deliverable() && now >= self.inner.next_frame_at.get() {
            self.update_rendering(now);
            ran = true;
        }
        ran
    }

    /// The earliest instant at which more work could become runnable, or
    /// `None` if nothing scheduled can ever run.
    fn next_wakeup(&self) -> Option<Instant> {
        if !self.is_task_queue_empty() || !self.is_microtask_queue_empty() {
            return Some(Instant::now());
        }
        let timer = self.inner.timers.borrow().keys().next().map(|(at, _)| *at);
        let frame = self
            .frames_deliverable()
            .then(|| self.inner.next_frame_at.get());
        match (timer, frame) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Returns true if no task, microtask, timer, or frame callback is pending.
    pub fn is_idle(&self) -> bool {
        self.is_task_queue_empty()
            && self.is_microtask_queue_empty()
            && self.pending_timers() == 0
            && self.pending_frame_requests() == 0
    }

    /// Runs the loop until nothing scheduled can run any more.
    pub fn run_until_idle(&self) {
        loop {
            self.perform_microtask_checkpoint();
            if self.turn() {
                continue;
            }
            match self.next_wakeup() {
                Some(at) => sleep_until(at),
                None => break,
            }
        }
    }

    /// Runs the loop until `promise` settles and returns its value.
    ///
    /// # Errors
    ///
    /// * [`HarnessError::HostStalled`] if nothing scheduled can settle the
    ///   promise (no tasks, microtasks, timers, or deliverable frames)
    /// * [`HarnessError::TimedOut`] if `timeout` elapses first
    pub fn block_on<T>(&self, promise: Promise<T>, timeout: Option<Duration>) -> HarnessResult<T> {
        let started = Instant::now();
        let watchdog = timeout.map(|limit| started + limit);

        loop {
            self.perform_microtask_checkpoint();
            if let Some(value) = promise.try_take() {
                return Ok(value);
            }

            if let Some(deadline) = watchdog {
                if Instant::now() >= deadline {
                    return Err(HarnessError::TimedOut {
                        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                    });
                }
            }

            if self.turn() {
                continue;
            }

            match (self.next_wakeup(), watchdog) {
                (Some(at), Some(deadline)) => sleep_until(at.min(deadline)),
                (Some(at), None) => sleep_until(at),
                (None, _) => {
                    tracing::warn!(
                        pending_frames = self.pending_frame_requests(),
                        "event loop stalled before the awaited result settled"
                    );
                    return Err(HarnessError::HostStalled);
                }
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("tasks", &self.inner.tasks.borrow().len())
            .field("microtasks", &self.inner.microtasks.len())
            .field("timers", &self.pending_timers())
            .field("frame_requests", &self.pending_frame_requests())
            .field("frames_rendered", &self.frames_rendered())
            .finish()
    }
}

fn sleep_until(at: Instant) {
    let now = Instant::now();
    if at > now {
        std::thread::sleep(at - now);
    }
}

/// Future that yields to the back of the microtask queue exactly once.
///
/// Awaiting it is the equivalent of `await Promise.resolve()`: every
/// microtask already queued runs before the awaiting task resumes.
#[derive(Debug, Default)]
pub struct NextMicrotask {
    yielded: bool,
}

/// Yields once to the microtask queue.
pub fn next_microtask() -> NextMicrotask {
    NextMicrotask::default()
}

impl Future for NextMicrotask {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
