//! Core types shared across the step-timing harness.
//!
//! This crate provides the foundational types used by the host event loop and
//! the step-timing core: error types, run parameters, and measurements.
//!
//! # Overview
//!
//! - [`HarnessError`] - Configuration errors, step failures, and host faults
//! - [`StepError`] - The error raised by a step's own work
//! - [`RunParameters`] - Per-run options (measurement method, warmup, delays)
//! - [`SuiteType`] - Whether a suite's steps are sync, async, or remote
//! - [`Measurement`] - Sync and async durations of one step run
//!
//! # Examples
//!
//! ```
//! use core_types::{HarnessError, RunParameters, StepError};
//!
//! let params = RunParameters::default();
//! assert_eq!(params.measurement_method, "raf");
//!
//! let error: HarnessError = StepError::new("step failed").into();
//! assert!(!error.is_config_error());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod measurement;
mod params;

pub use error::{HarnessError, HarnessResult, StepError};
pub use measurement::Measurement;
pub use params::{duration_from_ms, RunParameters, SuiteType, MAX_DELAY_MS};
