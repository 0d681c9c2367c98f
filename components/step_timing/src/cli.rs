//! Command-line arguments for `step-bench`.

use crate::config::HarnessConfig;
use clap::Parser;
use std::path::PathBuf;

/// Step-timing benchmark harness
#[derive(Parser, Debug)]
#[command(name = "step-bench")]
#[command(version = "0.1.0")]
#[command(about = "Measures the sync and async cost of benchmark steps", long_about = None)]
pub struct Cli {
    /// Invoker strategy: raf or async
    #[arg(long, value_name = "METHOD")]
    pub measurement_method: Option<String>,

    /// Use the async-ordering strategy for every step
    #[arg(long)]
    pub use_async_steps: bool,

    /// Busy-wait this many milliseconds right before each step
    #[arg(long, value_name = "MS")]
    pub warmup_before_sync: Option<f64>,

    /// Delay scheduling of each step by this many milliseconds
    #[arg(long, value_name = "MS")]
    pub wait_before_sync: Option<f64>,

    /// Number of times each suite is run
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Distance between rendering opportunities
    #[arg(long, value_name = "MS")]
    pub frame_interval_ms: Option<f64>,

    /// Fail a step that has not reported after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub step_timeout_ms: Option<f64>,

    /// Runner for every suite: default, async, or remote
    #[arg(long, value_name = "KIND")]
    pub runner: Option<String>,

    /// JSON config file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Dump the performance timeline after the run
    #[arg(long)]
    pub trace: bool,

    /// Log scheduling decisions (repeat for timeline entries)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Overrides `config` with every flag that was given.
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(method) = &self.measurement_method {
            config.params.measurement_method = method.clone();
        }
        if self.use_async_steps {
            config.params.use_async_steps = true;
        }
        if let Some(ms) = self.warmup_before_sync {
            config.params.warmup_before_sync = Some(ms);
        }
        if let Some(ms) = self.wait_before_sync {
            config.params.wait_before_sync = Some(ms);
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(ms) = self.frame_interval_ms {
            config.frame_interval_ms = Some(ms);
        }
        if let Some(ms) = self.step_timeout_ms {
            config.step_timeout_ms = Some(ms);
        }
        if let Some(runner) = &self.runner {
            config.runner = Some(runner.clone());
        }
        config
    }

    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
