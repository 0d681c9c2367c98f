//! Error types shared by the host event loop and the step-timing core.
//!
//! Three kinds of failure exist: configuration errors (fatal to the run that
//! hit them), step failures (the step's own error, carried unmodified), and
//! host-timing faults (a scheduled callback that can never fire).

use thiserror::Error;

/// The error raised by a step's own `run` operation.
///
/// # Examples
///
/// ```
/// use core_types::StepError;
///
/// let error = StepError::new("list did not render");
/// assert_eq!(error.to_string(), "list did not render");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StepError {
    /// Human-readable error message
    pub message: String,
}

impl StepError {
    /// Creates a new StepError with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Top-level error for running steps and suites.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HarnessError {
    // Configuration errors
    /// The configured measurement method names no known invoker strategy.
    #[error("unrecognized measurement method `{0}` (expected one of: raf, async)")]
    UnknownMeasurementMethod(String),

    /// A configuration value is out of range or could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Step failures
    /// The step's run operation raised or its pending result rejected.
    #[error(transparent)]
    Step(#[from] StepError),

    /// A phase boundary was read before it was recorded.
    #[error("phase boundary `{0}` was not recorded before the report")]
    MissingPhase(&'static str),

    // Timeline errors
    /// A measure referenced a mark that was never recorded.
    #[error("no mark named `{0}` has been recorded")]
    UnknownMark(String),

    // Host-timing faults
    /// The event loop has no work left that could settle the awaited result.
    #[error("host event loop stalled: no task, timer, or deliverable frame can settle the pending result")]
    HostStalled,

    /// The driver's watchdog elapsed before the pending result settled.
    #[error("timed out after {elapsed_ms:.1}ms waiting for the pending result")]
    TimedOut {
        /// Time spent waiting, in milliseconds
        elapsed_ms: f64,
    },
}

impl HarnessError {
    /// Returns true for errors that come from configuration rather than from
    /// running a step.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            HarnessError::UnknownMeasurementMethod(_) | HarnessError::InvalidConfig(_)
        )
    }

    /// Returns the step's own error if this is a step failure.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            HarnessError::Step(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
