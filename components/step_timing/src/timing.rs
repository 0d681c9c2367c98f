//! Timing primitives: a monotonic timestamp source and a named-interval
//! timeline.
//!
//! Duration math always uses raw timestamps from [`Performance::now`] or the
//! value returned by [`Performance::mark`]; measures exist only so external
//! tooling can see phase boundaries. Every entry is also emitted as a TRACE
//! event on the `step_timing::timeline` target.

use async_runtime::Clock;
use core_types::{HarnessError, HarnessResult};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Kind of a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// A point in time
    Mark,
    /// An interval between two marks
    Measure,
}

/// One recorded mark or measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceEntry {
    /// Label of the mark or name of the measure
    pub name: String,
    /// Whether this is a mark or a measure
    pub entry_type: EntryType,
    /// Milliseconds since the time origin
    pub start_time: f64,
    /// Zero for marks; interval length for measures
    pub duration: f64,
}

/// The performance timeline of one host.
///
/// Cloning yields another handle to the same timeline.
///
/// # Examples
///
/// ```
/// use async_runtime::Clock;
/// use step_timing::Performance;
///
/// let performance = Performance::new(Clock::new());
/// let start = performance.mark("work-start");
/// let end = performance.mark("work-end");
/// assert!(end >= start);
///
/// let measure = performance.measure("work", "work-start", "work-end").unwrap();
/// assert_eq!(measure.duration, end - start);
/// ```
#[derive(Debug, Clone)]
pub struct Performance {
    clock: Clock,
    entries: Rc<RefCell<Vec<PerformanceEntry>>>,
}

impl Performance {
    /// Creates an empty timeline on `clock`.
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Milliseconds since the time origin.
    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Records a mark and returns its timestamp.
    pub fn mark(&self, label: &str) -> f64 {
        let start_time = self.now();
        tracing::trace!(target: "step_timing::timeline", label, start_time, "mark");
        self.entries.borrow_mut().push(PerformanceEntry {
            name: label.to_string(),
            entry_type: EntryType::Mark,
            start_time,
            duration: 0.0,
        });
        start_time
    }

    /// Records the interval between the latest marks named `start_label` and
    /// `end_label`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::UnknownMark`] if either label was never marked.
    pub fn measure(
        &self,
        name: &str,
        start_label: &str,
        end_label: &str,
    ) -> HarnessResult<PerformanceEntry> {
        let start = self.latest_mark(start_label)?;
        let end = self.latest_mark(end_label)?;
        let entry = PerformanceEntry {
            name: name.to_string(),
            entry_type: EntryType::Measure,
            start_time: start,
            duration: end - start,
        };
        tracing::trace!(
            target: "step_timing::timeline",
            measure = name,
            start_time = entry.start_time,
            duration = entry.duration,
            "measure"
        );
        self.entries.borrow_mut().push(entry.clone());
        Ok(entry)
    }

    fn latest_mark(&self, label: &str) -> HarnessResult<f64> {
        self.entries
            .borrow()
            .iter()
            .rev()
            .find(|entry| entry.entry_type == EntryType::Mark && entry.name == label)
            .map(|entry| entry.start_time)
            .ok_or_else(|| HarnessError::UnknownMark(label.to_string()))
    }

    /// All entries in recording order.
    pub fn entries(&self) -> Vec<PerformanceEntry> {
        self.entries.borrow().clone()
    }

    /// Entries with the given name.
    pub fn entries_by_name(&self, name: &str) -> Vec<PerformanceEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.name == name)
            .cloned()
            .collect()
    }

    /// Entries of the given type.
    pub fn entries_by_type(&self, entry_type: EntryType) -> Vec<PerformanceEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.entry_type == entry_type)
            .cloned()
            .collect()
    }

    /// Drops every recorded entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
