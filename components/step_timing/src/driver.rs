//! Suite driver.
//!
//! Runs every step of every suite one at a time, never starting a step until
//! the previous one has reported, and collects one [`StepReport`] per step and
//! iteration.

use crate::host::Host;
use crate::runner::{RunnerKind, StepRunner};
use crate::suite::Suite;
use core_types::{HarnessResult, RunParameters};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;

/// Measured durations of one step in one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    /// Suite name
    pub suite: String,
    /// Step name
    pub step: String,
    /// Zero-based iteration index
    pub iteration: u32,
    /// Time spent in the step's own work
    pub sync_duration_ms: f64,
    /// Time from the end of the step's work until rendering settled
    pub async_duration_ms: f64,
}

impl StepReport {
    /// Sum of both phases.
    pub fn total_ms(&self) -> f64 {
        self.sync_duration_ms + self.async_duration_ms
    }
}

/// Drives suites through a host.
#[derive(Debug)]
pub struct SuiteDriver {
    host: Host,
    params: RunParameters,
    iterations: u32,
    step_timeout: Option<Duration>,
    runner_override: Option<RunnerKind>,
}

impl SuiteDriver {
    /// Creates a driver running one iteration with no watchdog.
    pub fn new(host: Host, params: RunParameters) -> Self {
        Self {
            host,
            params,
            iterations: 1,
            step_timeout: None,
            runner_override: None,
        }
    }

    /// Sets how many times each suite is run.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Fails a step that has not reported within `timeout`.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Uses `kind` for every step instead of deriving it from the suite type.
    pub fn with_runner_kind(mut self, kind: RunnerKind) -> Self {
        self.runner_override = Some(kind);
        self
    }

    /// The host steps run in.
    pub fn host(&self) -> &Host {
        &self.host
    }

    fn runner_kind(&self, suite: &Suite) -> RunnerKind {
        self.runner_override
            .unwrap_or_else(|| RunnerKind::for_suite_type(suite.suite_type))
    }

    /// Runs each step of `suite` once, as iteration `iteration`.
    ///
    /// Stops at the first failing step.
    pub fn run_suite(&self, suite: &Rc<Suite>, iteration: u32) -> HarnessResult<Vec<StepReport>> {
        let kind = self.runner_kind(suite);
        tracing::info!(suite = %suite.name, iteration, runner = %kind, "running suite");

        let mut reports = Vec::with_capacity(suite.steps().len());
        for step in suite.steps() {
            let runner = StepRunner::new(
                &self.host,
                suite.page().cloned(),
                self.params.clone(),
                suite.clone(),
                step.clone(),
                kind,
            );
            let suite_name = suite.name.clone();
            let promise = runner.run_step(move |step, measurement| StepReport {
                suite: suite_name,
                step: step.name().to_string(),
                iteration,
                sync_duration_ms: measurement.sync_duration_ms,
                async_duration_ms: measurement.async_duration_ms,
            });

            let report = self
                .host
                .event_loop()
                .block_on(promise, self.step_timeout)
                .and_then(|result| result)
                .map_err(|err| {
                    tracing::error!(
                        suite = %suite.name,
                        step = step.name(),
                        error = %err,
                        "step failed"
                    );
                    err
                })?;

            tracing::debug!(
                suite = %report.suite,
                step = %report.step,
                sync_ms = report.sync_duration_ms,
                async_ms = report.async_duration_ms,
                "step reported"
            );
            reports.push(report);
        }
        Ok(reports)
    }

    /// Runs all suites for the configured number of iterations.
    pub fn run_suites(&self, suites: &[Rc<Suite>]) -> HarnessResult<Vec<StepReport>> {
        let mut reports = Vec::new();
        for iteration in 0..self.iterations {
            for suite in suites {
                reports.extend(self.run_suite(suite, iteration)?);
            }
        }
        Ok(reports)
    }
}
