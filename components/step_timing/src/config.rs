//! Harness configuration.
//!
//! Read from a JSON file with camelCase keys, for example:
//!
//! ```json
//! {
//!   "measurementMethod": "async",
//!   "warmupBeforeSync": 5,
//!   "iterations": 3,
//!   "frameIntervalMs": 16.7,
//!   "stepTimeoutMs": 10000,
//!   "runner": "default"
//! }
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use crate::invoker::InvokerKind;
use crate::runner::RunnerKind;
use async_runtime::EventLoopConfig;
use core_types::{duration_from_ms, HarnessError, HarnessResult, RunParameters};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Options for one harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessConfig {
    /// Parameters handed to every step runner
    #[serde(flatten)]
    pub params: RunParameters,
    /// Times each suite is run
    pub iterations: u32,
    /// Distance between rendering opportunities; the host default if absent
    pub frame_interval_ms: Option<f64>,
    /// Watchdog for a single step; no watchdog if absent
    pub step_timeout_ms: Option<f64>,
    /// Runner used for every suite (`default`, `async`, `remote`); derived
    /// from each suite's type if absent
    pub runner: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            params: RunParameters::default(),
            iterations: 1,
            frame_interval_ms: None,
            step_timeout_ms: None,
            runner: None,
        }
    }
}

impl HarnessConfig {
    /// Loads and validates a config file.
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_json_str(&text)
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(text: &str) -> HarnessResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| HarnessError::InvalidConfig(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value that would otherwise fail later, mid-run.
    pub fn validate(&self) -> HarnessResult<()> {
        self.params.measurement_method.parse::<InvokerKind>()?;
        if self.iterations == 0 {
            return Err(HarnessError::InvalidConfig(
                "iterations must be at least 1".to_string(),
            ));
        }
        self.params.validate()?;
        self.event_loop_config()?;
        self.step_timeout()?;
        self.runner_kind()?;
        Ok(())
    }

    /// Event loop settings for the host.
    pub fn event_loop_config(&self) -> HarnessResult<EventLoopConfig> {
        match self.frame_interval_ms {
            Some(ms) => EventLoopConfig::with_frame_interval_ms(ms),
            None => Ok(EventLoopConfig::default()),
        }
    }

    /// The per-step watchdog.
    pub fn step_timeout(&self) -> HarnessResult<Option<Duration>> {
        self.step_timeout_ms
            .map(|ms| duration_from_ms("stepTimeoutMs", ms))
            .transpose()
    }

    /// The runner override, if one is configured.
    pub fn runner_kind(&self) -> HarnessResult<Option<RunnerKind>> {
        self.runner
            .as_deref()
            .map(str::parse::<RunnerKind>)
            .transpose()
    }
}
