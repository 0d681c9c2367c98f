//! Steps and suites.
//!
//! A [`Step`] is a named unit of work; its `run` either completes on the spot
//! or hands back a pending result. A [`Suite`] is an ordered, immutable list
//! of steps plus the suite type that drives invoker selection.

use crate::page::Page;
use async_runtime::LocalFuture;
use core_types::{StepError, SuiteType};
use std::future::Future;
use std::rc::Rc;

/// Outcome of a step's own work.
pub type StepResult = Result<(), StepError>;

/// What calling a step's `run` produced.
pub enum StepRun {
    /// The work finished synchronously
    Complete(StepResult),
    /// The work continues asynchronously
    Pending(LocalFuture<StepResult>),
}

impl std::fmt::Debug for StepRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepRun::Complete(result) => f.debug_tuple("Complete").field(result).finish(),
            StepRun::Pending(_) => write!(f, "Pending(..)"),
        }
    }
}

type SyncWork = Box<dyn Fn(Option<&dyn Page>) -> StepResult>;
type PendingWork = Box<dyn Fn(Option<Rc<dyn Page>>) -> LocalFuture<StepResult>>;

enum StepWork {
    Sync(SyncWork),
    Pending(PendingWork),
}

/// A named unit of timed work.
///
/// # Examples
///
/// ```
/// use step_timing::{Step, StepRun};
///
/// let step = Step::sync("Add", |_page| Ok(()));
/// assert!(matches!(step.run(None), StepRun::Complete(Ok(()))));
///
/// let step = Step::with_pending("Fetch", |_page| async { Ok(()) });
/// assert!(matches!(step.run(None), StepRun::Pending(_)));
/// ```
pub struct Step {
    name: String,
    work: StepWork,
}

impl Step {
    /// A step whose work completes before `run` returns.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<&dyn Page>) -> StepResult + 'static,
    {
        Self {
            name: name.into(),
            work: StepWork::Sync(Box::new(f)),
        }
    }

    /// A step whose `run` returns a pending result.
    pub fn with_pending<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<Rc<dyn Page>>) -> Fut + 'static,
        Fut: Future<Output = StepResult> + 'static,
    {
        Self {
            name: name.into(),
            work: StepWork::Pending(Box::new(move |page| -> LocalFuture<StepResult> {
                Box::pin(f(page))
            })),
        }
    }

    /// The step's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `run` hands back a pending result.
    pub fn returns_pending(&self) -> bool {
        matches!(self.work, StepWork::Pending(_))
    }

    /// Starts the step's work against `page`.
    pub fn run(&self, page: Option<&Rc<dyn Page>>) -> StepRun {
        match &self.work {
            StepWork::Sync(work) => StepRun::Complete(work(page.map(|p| &**p))),
            StepWork::Pending(work) => StepRun::Pending(work(page.cloned())),
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("returns_pending", &self.returns_pending())
            .finish()
    }
}

/// An ordered group of steps sharing an execution mode.
pub struct Suite {
    /// Suite name, used as the first part of every mark label
    pub name: String,
    /// Whether the suite's steps are sync, async, or remote
    pub suite_type: SuiteType,
    /// Free-form tags
    pub tags: Vec<String>,
    steps: Vec<Rc<Step>>,
    page: Option<Rc<dyn Page>>,
}

impl Suite {
    /// Creates an empty suite.
    pub fn new(name: impl Into<String>, suite_type: SuiteType) -> Self {
        Self {
            name: name.into(),
            suite_type,
            tags: Vec::new(),
            steps: Vec::new(),
            page: None,
        }
    }

    /// Adds tags to the suite.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Appends a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(Rc::new(step));
        self
    }

    /// Sets the page the suite's steps run against.
    pub fn with_page(mut self, page: Rc<dyn Page>) -> Self {
        self.page = Some(page);
        self
    }

    /// The page the suite's steps run against, if any.
    pub fn page(&self) -> Option<&Rc<dyn Page>> {
        self.page.as_ref()
    }

    /// The suite's steps in order.
    pub fn steps(&self) -> &[Rc<Step>] {
        &self.steps
    }

    /// Returns true if the suite's steps are inherently asynchronous.
    pub fn is_async(&self) -> bool {
        self.suite_type == SuiteType::Async
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("suite_type", &self.suite_type)
            .field("tags", &self.tags)
            .field("steps", &self.steps)
            .field("has_page", &self.page.is_some())
            .finish()
    }
}
