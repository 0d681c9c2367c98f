//! Pages steps run against.
//!
//! The step runner only needs one thing from a page: a way to force pending
//! layout to settle before the async phase is measured.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A page whose layout can be forced.
pub trait Page {
    /// Settles any pending layout work.
    fn layout(&self);
}

/// A page whose layout costs a fixed amount of busy time after each
/// invalidation.
///
/// # Examples
///
/// ```
/// use step_timing::{Page, SimulatedPage};
/// use std::time::Duration;
///
/// let page = SimulatedPage::new(Duration::from_millis(1));
/// page.layout();
/// assert_eq!(page.layouts(), 0);
///
/// page.invalidate();
/// page.layout();
/// page.layout();
/// assert_eq!(page.layouts(), 1);
/// ```
#[derive(Debug)]
pub struct SimulatedPage {
    layout_cost: Duration,
    dirty: Cell<bool>,
    layouts: Cell<u64>,
}

impl SimulatedPage {
    /// Creates a clean page.
    pub fn new(layout_cost: Duration) -> Self {
        Self {
            layout_cost,
            dirty: Cell::new(false),
            layouts: Cell::new(0),
        }
    }

    /// Marks the page as needing layout.
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    /// Returns true if layout is pending.
    pub fn needs_layout(&self) -> bool {
        self.dirty.get()
    }

    /// Number of layouts actually performed.
    pub fn layouts(&self) -> u64 {
        self.layouts.get()
    }
}

impl Page for SimulatedPage {
    fn layout(&self) {
        if !self.dirty.replace(false) {
            return;
        }
        let start = Instant::now();
        while start.elapsed() < self.layout_cost {
            std::hint::spin_loop();
        }
        self.layouts.set(self.layouts.get() + 1);
    }
}
