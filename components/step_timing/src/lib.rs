//! Step-timing benchmark harness
//!
//! Measures how long each step of a benchmark suite takes, split into two
//! phases:
//!
//! - **sync**: the step's own work
//! - **async**: everything from the end of that work until rendering has
//!   settled (forced layout, pending timers, posted messages)
//!
//! A [`StepRunner`] owns the mark labels and duration bookkeeping for one
//! step. It hands three callbacks to a [`StepInvoker`], which decides when
//! they fire relative to animation frames, timers, and messages on the
//! [`Host`] event loop. The [`SuiteDriver`] runs steps one at a time and
//! collects a [`StepReport`] for each.
//!
//! # Examples
//!
//! ```
//! use core_types::RunParameters;
//! use step_timing::{workloads, Host, SuiteDriver};
//!
//! let host = Host::default();
//! let suites = vec![std::rc::Rc::new(workloads::compute_suite())];
//! let driver = SuiteDriver::new(host, RunParameters::default());
//!
//! let reports = driver.run_suites(&suites).unwrap();
//! assert_eq!(reports.len(), suites[0].steps().len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod driver;
pub mod host;
pub mod invoker;
pub mod page;
pub mod report;
pub mod runner;
pub mod suite;
pub mod timing;
pub mod workloads;

pub use cli::Cli;
pub use config::HarnessConfig;
pub use driver::{StepReport, SuiteDriver};
pub use host::Host;
pub use invoker::{AsyncStepInvoker, InvocationContext, InvokerKind, RafStepInvoker, StepInvoker};
pub use page::{Page, SimulatedPage};
pub use runner::{RunnerKind, StepRunner};
pub use suite::{Step, StepResult, StepRun, Suite};
pub use timing::{EntryType, Performance, PerformanceEntry};
