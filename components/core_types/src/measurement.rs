//! The two durations produced by one step invocation.

use serde::{Deserialize, Serialize};

/// Timing result of one step run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Time from sync-phase start to its logical end, in milliseconds
    pub sync_duration_ms: f64,
    /// Time from sync-phase end to async-phase completion, in milliseconds
    pub async_duration_ms: f64,
}

impl Measurement {
    /// Sum of both phases.
    pub fn total_ms(&self) -> f64 {
        self.sync_duration_ms + self.async_duration_ms
    }
}
