//! Integration test suite for the step-timing harness
//!
//! Verifies that the host event loop, the invoker strategies, and the step
//! runner work together across component boundaries.

/// Re-export components for test convenience
pub mod components {
    pub use async_runtime;
    pub use core_types;
    pub use step_timing;
}
