//! Per-run parameters and suite classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::HarnessError;

/// Options recognized for one benchmark run.
///
/// Keys use the camelCase names of the configuration surface
/// (`measurementMethod`, `useAsyncSteps`, `warmupBeforeSync`,
/// `waitBeforeSync`). The measurement method is kept as the raw configured
/// string; it is resolved to an invoker when a step runs, so an unknown name
/// fails the step that uses it.
///
/// # Examples
///
/// ```
/// use core_types::RunParameters;
///
/// let params: RunParameters =
///     serde_json::from_str(r#"{"measurementMethod": "async", "warmupBeforeSync": 5}"#).unwrap();
/// assert_eq!(params.measurement_method, "async");
/// assert!(params.warmup_before_sync().is_some());
/// assert_eq!(params.wait_before_sync(), Ok(None));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunParameters {
    /// Name of the invoker strategy (`raf` or `async`)
    pub measurement_method: String,
    /// Forces the async-ordering strategy for every step
    pub use_async_steps: bool,
    /// Milliseconds of busy-wait right before the sync phase
    pub warmup_before_sync: Option<f64>,
    /// Milliseconds of real delay before any scheduling begins
    pub wait_before_sync: Option<f64>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            measurement_method: "raf".to_string(),
            use_async_steps: false,
            warmup_before_sync: None,
            wait_before_sync: None,
        }
    }
}

impl RunParameters {
    /// Warmup busy-wait length in milliseconds, if one is configured.
    ///
    /// Zero, negative, and non-finite values count as absent.
    pub fn warmup_before_sync(&self) -> Option<f64> {
        positive_ms(self.warmup_before_sync)
    }

    /// Delay before scheduling begins, if one is configured.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidConfig`] if the delay is above [`MAX_DELAY_MS`].
    pub fn wait_before_sync(&self) -> Result<Option<Duration>, HarnessError> {
        positive_ms(self.wait_before_sync)
            .map(|ms| duration_from_ms("waitBeforeSync", ms))
            .transpose()
    }

    /// Checks that every configured delay is within range.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if let Some(ms) = self.warmup_before_sync() {
            duration_from_ms("warmupBeforeSync", ms)?;
        }
        self.wait_before_sync()?;
        Ok(())
    }
}

/// Upper bound for every millisecond setting (one day).
pub const MAX_DELAY_MS: f64 = 86_400_000.0;

/// Converts a millisecond setting named `key` to a [`Duration`].
///
/// # Errors
///
/// [`HarnessError::InvalidConfig`] unless `ms` is positive, finite, and at
/// most [`MAX_DELAY_MS`].
///
/// # Examples
///
/// ```
/// use core_types::duration_from_ms;
/// use std::time::Duration;
///
/// assert_eq!(duration_from_ms("stepTimeoutMs", 250.0), Ok(Duration::from_millis(250)));
/// assert!(duration_from_ms("stepTimeoutMs", 1e30).is_err());
/// ```
pub fn duration_from_ms(key: &str, ms: f64) -> Result<Duration, HarnessError> {
    if !ms.is_finite() || ms <= 0.0 {
        return Err(HarnessError::InvalidConfig(format!(
            "{} must be a positive number of milliseconds, got {}",
            key, ms
        )));
    }
    if ms > MAX_DELAY_MS {
        return Err(HarnessError::InvalidConfig(format!(
            "{} of {}ms exceeds the {}ms limit",
            key, ms, MAX_DELAY_MS
        )));
    }
    Duration::try_from_secs_f64(ms / 1000.0)
        .map_err(|e| HarnessError::InvalidConfig(format!("{} is out of range: {}", key, e)))
}

fn positive_ms(value: Option<f64>) -> Option<f64> {
    value.filter(|ms| ms.is_finite() && *ms > 0.0)
}

/// How a suite's steps behave with respect to asynchrony.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteType {
    /// Steps do their work synchronously
    #[default]
    Default,
    /// Steps are inherently asynchronous
    Async,
    /// Steps execute in a remote page (e.g. an embedded frame)
    Remote,
}

impl SuiteType {
    /// The configuration name of this suite type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteType::Default => "default",
            SuiteType::Async => "async",
            SuiteType::Remote => "remote",
        }
    }
}

impl fmt::Display for SuiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuiteType {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SuiteType::Default),
            "async" => Ok(SuiteType::Async),
            "remote" => Ok(SuiteType::Remote),
            other => Err(HarnessError::InvalidConfig(format!(
                "unknown suite type `{}`",
                other
            ))),
        }
    }
}
