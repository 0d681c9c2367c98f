//! Invoker strategies.
//!
//! An invoker decides when, relative to the host's frames and task queue, a
//! step's three callbacks fire: the sync callback (the step's own work), the
//! async callback (the measurement of the async phase), and the report. Every
//! strategy resolves the promise returned by `start()` with the report's value,
//! or with the first error raised by the sync callback; on error the async and
//! report callbacks never run.
//!
//! Strategies are a closed set selected by name:
//!
//! | name    | strategy                 |
//! |---------|--------------------------|
//! | `raf`   | [`RafStepInvoker`]       |
//! | `async` | [`AsyncStepInvoker`]     |

use crate::host::Host;
use async_runtime::{next_microtask, EventLoop, LocalFuture, Promise, Resolver};
use core_types::{HarnessError, HarnessResult, RunParameters};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

/// Names of the available invoker strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokerKind {
    /// Render-frame strategy
    Raf,
    /// Async-ordering strategy
    Async,
}

impl InvokerKind {
    /// Every strategy, in registry order.
    pub const ALL: [InvokerKind; 2] = [InvokerKind::Raf, InvokerKind::Async];

    /// The configuration name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvokerKind::Raf => "raf",
            InvokerKind::Async => "async",
        }
    }
}

impl fmt::Display for InvokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvokerKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raf" => Ok(InvokerKind::Raf),
            "async" => Ok(InvokerKind::Async),
            other => Err(HarnessError::UnknownMeasurementMethod(other.to_string())),
        }
    }
}

type SyncCallback = Box<dyn FnOnce() -> LocalFuture<HarnessResult<()>>>;
type AsyncCallback = Box<dyn FnOnce()>;
type ReportCallback<R> = Box<dyn FnOnce() -> HarnessResult<R>>;

/// The callbacks and parameters bound to one `start()` call.
pub struct InvocationContext<R> {
    run_sync: SyncCallback,
    measure_async: AsyncCallback,
    report: ReportCallback<R>,
    params: RunParameters,
}

impl<R> InvocationContext<R> {
    /// Bundles the three callbacks with the run parameters.
    pub fn new<S, Fut, M, P>(run_sync: S, measure_async: M, report: P, params: RunParameters) -> Self
    where
        S: FnOnce() -> Fut + 'static,
        Fut: Future<Output = HarnessResult<()>> + 'static,
        M: FnOnce() + 'static,
        P: FnOnce() -> HarnessResult<R> + 'static,
    {
        Self {
            run_sync: Box::new(move || -> LocalFuture<HarnessResult<()>> { Box::pin(run_sync()) }),
            measure_async: Box::new(measure_async),
            report: Box::new(report),
            params,
        }
    }

    /// The run parameters.
    pub fn params(&self) -> &RunParameters {
        &self.params
    }
}

impl<R> fmt::Debug for InvocationContext<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Runs `schedule` now, or after `wait` if one is configured.
fn defer_start<F>(event_loop: &EventLoop, wait: Option<Duration>, schedule: F)
where
    F: FnOnce() + 'static,
{
    match wait {
        Some(wait) => {
            tracing::debug!(wait_ms = wait.as_secs_f64() * 1000.0, "delaying step scheduling");
            event_loop.set_timeout(wait, schedule);
        }
        None => schedule(),
    }
}

/// Render-frame strategy.
///
/// The sync callback runs in the next frame callback. A second frame callback,
/// registered right after it, defers the async measurement by one task and the
/// report by one more. This assumes the effects of the sync callback are
/// delivered before the second frame callback runs, which holds for steps that
/// do no cross-turn asynchronous work. The measurement never runs before the
/// sync callback's own future has settled.
pub struct RafStepInvoker<R> {
    host: Host,
    context: InvocationContext<R>,
}

impl<R: 'static> RafStepInvoker<R> {
    /// Binds the strategy to a host and an invocation context.
    pub fn new(host: &Host, context: InvocationContext<R>) -> Self {
        Self {
            host: host.clone(),
            context,
        }
    }

    /// Schedules the callbacks; the promise settles with the report's value.
    pub fn start(self) -> Promise<HarnessResult<R>> {
        let wait = match self.context.params.wait_before_sync() {
            Ok(wait) => wait,
            Err(err) => return Promise::resolved(Err(err)),
        };
        let (resolver, promise) = Promise::pending();
        let event_loop = self.host.event_loop().clone();
        defer_start(&event_loop, wait, move || self.schedule_callbacks(resolver));
        promise
    }

    fn schedule_callbacks(self, resolver: Resolver<HarnessResult<R>>) {
        let InvocationContext {
            run_sync,
            measure_async,
            report,
            ..
        } = self.context;
        let event_loop = self.host.event_loop().clone();
        let sync_phase: Rc<RefCell<Option<Promise<HarnessResult<()>>>>> = Rc::default();

        let el = event_loop.clone();
        let slot = sync_phase.clone();
        event_loop.request_animation_frame(move |_| {
            *slot.borrow_mut() = Some(el.spawn(run_sync()));
        });

        let el = event_loop.clone();
        event_loop.request_animation_frame(move |_| {
            let timer_loop = el.clone();
            el.set_timeout(Duration::ZERO, move || {
                let sync = sync_phase.borrow_mut().take();
                let report_loop = timer_loop.clone();
                timer_loop.spawn(async move {
                    let outcome = match sync {
                        Some(sync) => sync.await,
                        None => Err(HarnessError::MissingPhase("sync-end")),
                    };
                    if let Err(err) = outcome {
                        resolver.resolve(Err(err));
                        return;
                    }
                    measure_async();
                    report_loop.set_timeout(Duration::ZERO, move || resolver.resolve(report()));
                });
            });
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Promise,
    Timer,
    Message,
}

type Continuation = Box<dyn FnOnce(HarnessResult<()>)>;

/// Three-way barrier; the continuation runs once, on the last signal or the
/// first failure.
struct Barrier {
    got_promise: Cell<bool>,
    got_timer: Cell<bool>,
    got_message: Cell<bool>,
    continuation: RefCell<Option<Continuation>>,
}

impl Barrier {
    fn new(continuation: Continuation) -> Self {
        Self {
            got_promise: Cell::new(false),
            got_timer: Cell::new(false),
            got_message: Cell::new(false),
            continuation: RefCell::new(Some(continuation)),
        }
    }

    fn signal(&self, signal: Signal) {
        match signal {
            Signal::Promise => self.got_promise.set(true),
            Signal::Timer => self.got_timer.set(true),
            Signal::Message => self.got_message.set(true),
        }
        tracing::trace!(?signal, "barrier signal");
        if self.got_promise.get() && self.got_timer.get() && self.got_message.get() {
            self.finish(Ok(()));
        }
    }

    fn fail(&self, err: HarnessError) {
        self.finish(Err(err));
    }

    fn finish(&self, outcome: HarnessResult<()>) {
        let continuation = self.continuation.borrow_mut().take();
        if let Some(continuation) = continuation {
            continuation(outcome);
        }
    }
}

/// Async-ordering strategy.
///
/// For steps whose work completes asynchronously, possibly across several
/// task turns. The async measurement waits for three signals:
///
/// 1. a microtask after the sync callback's own future settles,
/// 2. a zero-delay timer (chained after a microtask) set from a second frame
///    callback,
/// 3. a one-shot message through the host's trigger channel, posted from that
///    second frame callback and chained after a microtask.
///
/// No single one of these is guaranteed to fire after every queued microtask
/// and task on every host; together they are. The report follows the
/// measurement by one zero-delay task.
pub struct AsyncStepInvoker<R> {
    host: Host,
    context: InvocationContext<R>,
}

impl<R: 'static> AsyncStepInvoker<R> {
    /// Binds the strategy to a host and an invocation context.
    pub fn new(host: &Host, context: InvocationContext<R>) -> Self {
        Self {
            host: host.clone(),
            context,
        }
    }

    /// Schedules the callbacks; the promise settles with the report's value.
    pub fn start(self) -> Promise<HarnessResult<R>> {
        let wait = match self.context.params.wait_before_sync() {
            Ok(wait) => wait,
            Err(err) => return Promise::resolved(Err(err)),
        };
        let (resolver, promise) = Promise::pending();
        let event_loop = self.host.event_loop().clone();
        defer_start(&event_loop, wait, move || self.schedule_callbacks(resolver));
        promise
    }

    fn schedule_callbacks(self, resolver: Resolver<HarnessResult<R>>) {
        let InvocationContext {
            run_sync,
            measure_async,
            report,
            ..
        } = self.context;
        let event_loop = self.host.event_loop().clone();
        let channel = self.host.trigger_channel().clone();

        let el = event_loop.clone();
        let barrier = Rc::new(Barrier::new(Box::new(move |outcome: HarnessResult<()>| match outcome {
            Ok(()) => {
                measure_async();
                el.set_timeout(Duration::ZERO, move || resolver.resolve(report()));
            }
            Err(err) => resolver.resolve(Err(err)),
        })));

        let el = event_loop.clone();
        let b = barrier.clone();
        event_loop.request_animation_frame(move |_| {
            el.spawn(async move {
                let outcome = run_sync().await;
                next_microtask().await;
                match outcome {
                    Ok(()) => b.signal(Signal::Promise),
                    Err(err) => b.fail(err),
                }
            });
        });

        let el = event_loop.clone();
        event_loop.request_animation_frame(move |_| {
            let timer_loop = el.clone();
            let b = barrier.clone();
            el.set_timeout(Duration::ZERO, move || {
                timer_loop.spawn(async move {
                    next_microtask().await;
                    b.signal(Signal::Timer);
                });
            });

            let message_loop = el.clone();
            let b = barrier;
            channel.port1.add_listener_once(move |_| {
                message_loop.spawn(async move {
                    next_microtask().await;
                    b.signal(Signal::Message);
                });
            });
            channel.port1.start();
            channel.port2.post_message("trigger port1 message callback");
        });
    }
}

/// A strategy bound to one invocation.
pub enum StepInvoker<R> {
    /// Render-frame strategy
    Raf(RafStepInvoker<R>),
    /// Async-ordering strategy
    Async(AsyncStepInvoker<R>),
}

impl<R: 'static> StepInvoker<R> {
    /// Builds the strategy named by `kind`.
    pub fn new(kind: InvokerKind, host: &Host, context: InvocationContext<R>) -> Self {
        match kind {
            InvokerKind::Raf => StepInvoker::Raf(RafStepInvoker::new(host, context)),
            InvokerKind::Async => StepInvoker::Async(AsyncStepInvoker::new(host, context)),
        }
    }

    /// The strategy's name.
    pub fn kind(&self) -> InvokerKind {
        match self {
            StepInvoker::Raf(_) => InvokerKind::Raf,
            StepInvoker::Async(_) => InvokerKind::Async,
        }
    }

    /// Schedules the invocation.
    pub fn start(self) -> Promise<HarnessResult<R>> {
        match self {
            StepInvoker::Raf(invoker) => invoker.start(),
            StepInvoker::Async(invoker) => invoker.start(),
        }
    }
}
