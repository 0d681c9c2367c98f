//! Step runner.
//!
//! A [`StepRunner`] drives one step through warmup, the timed sync phase, the
//! timed async phase, and the report. The invoker it builds decides when each
//! of those callbacks fires; the runner's [`RunnerKind`] decides only how the
//! step's own work is executed inside the sync phase.

use crate::host::Host;
use crate::invoker::{InvocationContext, InvokerKind, StepInvoker};
use crate::page::Page;
use crate::suite::{Step, StepResult, StepRun, Suite};
use crate::timing::Performance;
use async_runtime::{LocalFuture, Promise};
use core_types::{
    HarnessError, HarnessResult, Measurement, RunParameters, StepError, SuiteType,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

const WARMUP_START: &str = "warmup-start";
const WARMUP_END: &str = "warmup-end";
const WARMUP_MEASURE: &str = "warmup";

/// How the sync phase executes a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunnerKind {
    /// Runs the step and ends the sync phase as soon as `run` returns; a
    /// pending result becomes part of the async phase
    #[default]
    Plain,
    /// Awaits the step's pending result before ending the sync phase
    Awaited,
    /// Same timing as `Plain`, for steps routed to a remote page
    Remote,
}

impl RunnerKind {
    /// The runner used for a suite of the given type.
    pub fn for_suite_type(suite_type: SuiteType) -> Self {
        match suite_type {
            SuiteType::Default => RunnerKind::Plain,
            SuiteType::Async => RunnerKind::Awaited,
            SuiteType::Remote => RunnerKind::Remote,
        }
    }

    /// The configuration name of this runner.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerKind::Plain => "default",
            RunnerKind::Awaited => "async",
            RunnerKind::Remote => "remote",
        }
    }

    /// Runs the step's sync phase.
    ///
    /// Returns once the sync phase is over, handing back any work that is
    /// still outstanding.
    async fn run_sync_phase(
        self,
        run: StepRun,
    ) -> Result<Option<LocalFuture<StepResult>>, StepError> {
        match (self, run) {
            (_, StepRun::Complete(result)) => result.map(|()| None),
            (RunnerKind::Awaited, StepRun::Pending(pending)) => pending.await.map(|()| None),
            (RunnerKind::Plain | RunnerKind::Remote, StepRun::Pending(pending)) => {
                Ok(Some(pending))
            }
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunnerKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" | "plain" => Ok(RunnerKind::Plain),
            "async" | "awaited" => Ok(RunnerKind::Awaited),
            "remote" => Ok(RunnerKind::Remote),
            other => Err(HarnessError::InvalidConfig(format!(
                "unknown runner kind `{}`",
                other
            ))),
        }
    }
}

/// Mark and measure names for one suite/step pair.
#[derive(Debug)]
struct MarkLabels {
    sync_start: String,
    sync_end: String,
    async_end: String,
    sync_measure: String,
    async_measure: String,
}

impl MarkLabels {
    fn new(suite: &str, step: &str) -> Self {
        Self {
            sync_start: format!("{}.{}-start", suite, step),
            sync_end: format!("{}.{}-sync-end", suite, step),
            async_end: format!("{}.{}-async-end", suite, step),
            sync_measure: format!("{}.{}-sync", suite, step),
            async_measure: format!("{}.{}-async", suite, step),
        }
    }
}

#[derive(Debug, Default)]
struct PhaseTimes {
    sync_duration: Option<f64>,
    sync_end: Option<f64>,
    async_duration: Option<f64>,
}

impl PhaseTimes {
    fn record_sync(&mut self, start: f64, end: f64) {
        self.sync_duration = Some(end - start);
        self.sync_end = Some(end);
    }

    fn record_async_end(&mut self, end: f64) {
        if let Some(sync_end) = self.sync_end {
            self.async_duration = Some(end - sync_end);
        }
    }

    fn measurement(&self) -> HarnessResult<Measurement> {
        Ok(Measurement {
            sync_duration_ms: self
                .sync_duration
                .ok_or(HarnessError::MissingPhase("sync-end"))?,
            async_duration_ms: self
                .async_duration
                .ok_or(HarnessError::MissingPhase("async-end"))?,
        })
    }
}

/// Blocks the thread for `ms` milliseconds.
fn busy_wait(performance: &Performance, ms: f64) {
    let start = performance.now();
    while performance.now() - start < ms {
        std::hint::spin_loop();
    }
}

fn record_measure(result: HarnessResult<crate::timing::PerformanceEntry>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "could not record measure");
    }
}

/// Runs one step of one suite.
///
/// # Examples
///
/// ```
/// use core_types::{RunParameters, SuiteType};
/// use step_timing::{Host, RunnerKind, Step, StepRunner, Suite};
/// use std::rc::Rc;
///
/// let host = Host::default();
/// let suite = Rc::new(
///     Suite::new("Example", SuiteType::Default).with_step(Step::sync("Work", |_| Ok(()))),
/// );
/// let step = suite.steps()[0].clone();
/// let runner = StepRunner::new(
///     &host,
///     None,
///     RunParameters::default(),
///     suite,
///     step,
///     RunnerKind::Plain,
/// );
///
/// let promise = runner.run_step(|step, measurement| (step.name().to_string(), measurement));
/// let (name, measurement) = host.event_loop().block_on(promise, None).unwrap().unwrap();
/// assert_eq!(name, "Work");
/// assert!(measurement.sync_duration_ms >= 0.0);
/// ```
pub struct StepRunner {
    host: Host,
    page: Option<Rc<dyn Page>>,
    params: RunParameters,
    suite: Rc<Suite>,
    step: Rc<Step>,
    kind: RunnerKind,
}

impl StepRunner {
    /// Binds a step of `suite` to the host, page, and run parameters.
    pub fn new(
        host: &Host,
        page: Option<Rc<dyn Page>>,
        params: RunParameters,
        suite: Rc<Suite>,
        step: Rc<Step>,
        kind: RunnerKind,
    ) -> Self {
        Self {
            host: host.clone(),
            page,
            params,
            suite,
            step,
            kind,
        }
    }

    /// The page the step runs against.
    pub fn page(&self) -> Option<&Rc<dyn Page>> {
        self.page.as_ref()
    }

    /// The step being run.
    pub fn step(&self) -> &Step {
        &self.step
    }

    /// How the sync phase executes the step.
    pub fn kind(&self) -> RunnerKind {
        self.kind
    }

    /// The invoker strategy this runner will use.
    ///
    /// An async suite or `useAsyncSteps` forces the async-ordering strategy;
    /// otherwise the strategy is the one named by `measurementMethod`.
    pub fn invoker_kind(&self) -> HarnessResult<InvokerKind> {
        if self.suite.is_async() {
            return Ok(InvokerKind::Async);
        }
        if self.params.use_async_steps {
            return Ok(InvokerKind::Async);
        }
        self.params.measurement_method.parse()
    }

    /// Runs the step and resolves with the value returned by `report`.
    ///
    /// `report` is called exactly once, after both phase boundaries have been
    /// recorded, with the step and its measurement. If the step fails, the
    /// promise settles with the step's error and `report` is never called. An
    /// unknown measurement method or an out-of-range delay yields an
    /// already-settled promise and schedules nothing.
    pub fn run_step<R, F>(&self, report: F) -> Promise<HarnessResult<R>>
    where
        R: 'static,
        F: FnOnce(&Step, Measurement) -> R + 'static,
    {
        let checked = self
            .invoker_kind()
            .and_then(|kind| self.params.validate().map(|()| kind));
        let invoker_kind = match checked {
            Ok(kind) => kind,
            Err(err) => {
                tracing::debug!(
                    suite = %self.suite.name,
                    step = self.step.name(),
                    error = %err,
                    "cannot run step"
                );
                return Promise::resolved(Err(err));
            }
        };

        // Prepare all mark labels outside the measured region.
        let labels = Rc::new(MarkLabels::new(&self.suite.name, self.step.name()));
        let times = Rc::new(RefCell::new(PhaseTimes::default()));
        let warmup = self.params.warmup_before_sync();

        let run_sync = {
            let labels = labels.clone();
            let times = times.clone();
            let performance = self.host.performance().clone();
            let step = self.step.clone();
            let page = self.page.clone();
            let kind = self.kind;
            move || async move {
                if let Some(ms) = warmup {
                    performance.mark(WARMUP_START);
                    busy_wait(&performance, ms);
                    performance.mark(WARMUP_END);
                }

                performance.mark(&labels.sync_start);
                let sync_start = performance.now();

                let outstanding = kind.run_sync_phase(step.run(page.as_ref())).await?;

                let sync_end = performance.mark(&labels.sync_end);
                times.borrow_mut().record_sync(sync_start, sync_end);

                if let Some(outstanding) = outstanding {
                    outstanding.await?;
                }
                Ok::<(), HarnessError>(())
            }
        };

        let measure_async = {
            let labels = labels.clone();
            let times = times.clone();
            let performance = self.host.performance().clone();
            let page = self.page.clone();
            move || {
                // Layout may be deferred until paint; force it so the async
                // phase includes it.
                if let Some(page) = &page {
                    page.layout();
                }

                let async_end = performance.now();
                performance.mark(&labels.async_end);
                times.borrow_mut().record_async_end(async_end);

                if warmup.is_some() {
                    record_measure(performance.measure(WARMUP_MEASURE, WARMUP_START, WARMUP_END));
                }
                record_measure(performance.measure(
                    &labels.sync_measure,
                    &labels.sync_start,
                    &labels.sync_end,
                ));
                record_measure(performance.measure(
                    &labels.async_measure,
                    &labels.sync_end,
                    &labels.async_end,
                ));
            }
        };

        let report = {
            let step = self.step.clone();
            move || -> HarnessResult<R> {
                let measurement = times.borrow().measurement()?;
                Ok(report(&step, measurement))
            }
        };

        tracing::debug!(
            suite = %self.suite.name,
            step = self.step.name(),
            invoker = %invoker_kind,
            runner = %self.kind,
            "running step"
        );
        let context = InvocationContext::new(run_sync, measure_async, report, self.params.clone());
        StepInvoker::new(invoker_kind, &self.host, context).start()
    }
}

impl fmt::Debug for StepRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRunner")
            .field("suite", &self.suite.name)
            .field("step", &self.step.name())
            .field("kind", &self.kind)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
