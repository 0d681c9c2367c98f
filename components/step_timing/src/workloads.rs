//! Built-in suites
//!
//! Synthetic workloads the `step-bench` binary runs:
//!
//! - `Compute` - CPU-bound sync steps
//! - `Layout` - sync steps that dirty a page whose layout is forced in the
//!   async phase
//! - `AsyncWork` - steps whose work continues over timers and microtasks

use crate::page::{Page, SimulatedPage};
use crate::suite::{Step, StepResult, Suite};
use async_runtime::{next_microtask, EventLoop};
use core_types::{StepError, SuiteType};
use std::hint::black_box;
use std::rc::Rc;
use std::time::Duration;

const LAYOUT_COST: Duration = Duration::from_millis(2);
const ASYNC_TIMER: Duration = Duration::from_millis(5);
const MICROTASK_CHAIN: usize = 64;

/// Creates every built-in suite.
pub fn create_suites(event_loop: &EventLoop) -> Vec<Rc<Suite>> {
    vec![
        Rc::new(compute_suite()),
        Rc::new(layout_suite()),
        Rc::new(async_suite(event_loop)),
    ]
}

fn fibonacci(n: u64) -> u64 {
    if n < 2 {
        n
    } else {
        fibonacci(n - 1) + fibonacci(n - 2)
    }
}

fn sieve(limit: usize) -> usize {
    let mut composite = vec![false; limit + 1];
    let mut count = 0;
    for i in 2..=limit {
        if !composite[i] {
            count += 1;
            let mut j = i * i;
            while j <= limit {
                composite[j] = true;
                j += i;
            }
        }
    }
    count
}

/// CPU-bound steps.
pub fn compute_suite() -> Suite {
    Suite::new("Compute", SuiteType::Default)
        .with_tags(["default", "compute"])
        .with_step(Step::sync("Fibonacci", |_| {
            let value = fibonacci(black_box(24));
            if value != 46_368 {
                return Err(StepError::new(format!("fibonacci(24) returned {}", value)));
            }
            Ok(())
        }))
        .with_step(Step::sync("Sort", |_| {
            let mut values: Vec<u64> = (0..20_000u64)
                .map(|i| i.wrapping_mul(2_654_435_761) % 100_003)
                .collect();
            values.sort_unstable();
            black_box(&values);
            if values.windows(2).any(|w| w[0] > w[1]) {
                return Err(StepError::new("sort produced unordered output"));
            }
            Ok(())
        }))
        .with_step(Step::sync("Sieve", |_| {
            let primes = sieve(black_box(100_000));
            if primes != 9_592 {
                return Err(StepError::new(format!("sieve found {} primes", primes)));
            }
            Ok(())
        }))
}

/// Steps that invalidate a page; the forced layout lands in the async phase.
pub fn layout_suite() -> Suite {
    let page = Rc::new(SimulatedPage::new(LAYOUT_COST));

    let add = {
        let page = page.clone();
        move |_: Option<&dyn Page>| -> StepResult {
            black_box(fibonacci(black_box(18)));
            page.invalidate();
            Ok(())
        }
    };
    let restyle = {
        let page = page.clone();
        move |_: Option<&dyn Page>| -> StepResult {
            page.invalidate();
            Ok(())
        }
    };

    Suite::new("Layout", SuiteType::Remote)
        .with_tags(["remote", "layout"])
        .with_step(Step::sync("AddItems", add))
        .with_step(Step::sync("Restyle", restyle))
        .with_step(Step::sync("Idle", |_| Ok(())))
        .with_page(page)
}

/// Steps whose work continues after `run` returns.
pub fn async_suite(event_loop: &EventLoop) -> Suite {
    let timer_loop = event_loop.clone();
    Suite::new("AsyncWork", SuiteType::Async)
        .with_tags(["async"])
        .with_step(Step::with_pending("Timer", move |_| {
            let sleep = timer_loop.delay(ASYNC_TIMER);
            async move {
                sleep.await;
                Ok(())
            }
        }))
        .with_step(Step::with_pending("MicrotaskChain", |_| async {
            let mut total = 0u64;
            for i in 0..MICROTASK_CHAIN {
                total += black_box(i as u64);
                next_microtask().await;
            }
            black_box(total);
            Ok(())
        }))
}
