//! End-to-End Step Timing Tests
//!
//! Runs whole steps through StepRunner on a real Host: invoker selection,
//! phase boundaries, warmup exclusion, failure propagation, and the suite
//! driver's watchdog.

use core_types::{HarnessError, HarnessResult, Measurement, RunParameters, StepError, SuiteType};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use step_timing::{Host, RunnerKind, Step, StepRunner, Suite, SuiteDriver};

/// Frame interval of the default host config
const FRAME_MS: f64 = 1000.0 / 60.0;

fn spin(ms: u64) {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(ms) {
        std::hint::spin_loop();
    }
}

/// Runs the only step of `suite` and counts report calls
fn run_single(
    host: &Host,
    suite: Suite,
    params: RunParameters,
    kind: RunnerKind,
) -> (HarnessResult<Measurement>, usize) {
    let suite = Rc::new(suite);
    let step = suite.steps()[0].clone();
    let runner = StepRunner::new(host, suite.page().cloned(), params, suite.clone(), step, kind);

    let reports = Rc::new(Cell::new(0));
    let counter = reports.clone();
    let promise = runner.run_step(move |_, measurement| {
        counter.set(counter.get() + 1);
        measurement
    });
    let result = host
        .event_loop()
        .block_on(promise, Some(Duration::from_secs(10)))
        .and_then(|r| r);
    (result, reports.get())
}

/// Test: ~10ms sync step under the render-frame strategy
#[test]
fn test_e2e_raf_sync_step() {
    let host = Host::default();
    let suite = Suite::new("Compute", SuiteType::Default).with_step(Step::sync("Work", |_| {
        spin(10);
        Ok(())
    }));

    let (result, reports) = run_single(&host, suite, RunParameters::default(), RunnerKind::Plain);
    let measurement = result.expect("step failed");

    assert_eq!(reports, 1);
    assert!(measurement.sync_duration_ms >= 10.0);
    assert!(measurement.sync_duration_ms < 10.0 + 5.0 * FRAME_MS);
    assert!(measurement.async_duration_ms >= 0.0);
    // One frame round trip, with slack for a loaded machine
    assert!(measurement.async_duration_ms < 4.0 * FRAME_MS);
}

/// Test: async suite whose step awaits a 30ms timer
#[test]
fn test_e2e_async_suite_timer() {
    let host = Host::default();
    let timers = host.event_loop().clone();
    let suite = Suite::new("AsyncWork", SuiteType::Async).with_step(Step::with_pending(
        "Timer",
        move |_| {
            let sleep = timers.delay(Duration::from_millis(30));
            async move {
                sleep.await;
                Ok(())
            }
        },
    ));

    let (result, reports) = run_single(&host, suite, RunParameters::default(), RunnerKind::Plain);
    let measurement = result.expect("step failed");

    assert_eq!(reports, 1);
    assert!(measurement.async_duration_ms >= 30.0);
    assert!(measurement.sync_duration_ms < 30.0);
}

/// Test: awaited runner moves the pending work into the sync phase
#[test]
fn test_e2e_awaited_runner_counts_pending_work_as_sync() {
    let host = Host::default();
    let timers = host.event_loop().clone();
    let suite = Suite::new("AsyncWork", SuiteType::Async).with_step(Step::with_pending(
        "Timer",
        move |_| {
            let sleep = timers.delay(Duration::from_millis(20));
            async move {
                sleep.await;
                Ok(())
            }
        },
    ));

    let (result, _) = run_single(&host, suite, RunParameters::default(), RunnerKind::Awaited);
    let measurement = result.expect("step failed");
    assert!(measurement.sync_duration_ms >= 20.0);
}

/// Test: warmup busy-wait is excluded from the sync duration
#[test]
fn test_e2e_warmup_excluded() {
    let suite = || {
        Suite::new("Compute", SuiteType::Default).with_step(Step::sync("Work", |_| {
            spin(5);
            Ok(())
        }))
    };

    let cold = RunParameters::default();
    let warm = RunParameters {
        warmup_before_sync: Some(50.0),
        ..RunParameters::default()
    };

    let host = Host::default();
    let (cold, _) = run_single(&host, suite(), cold, RunnerKind::Plain);
    let (warm, _) = run_single(&host, suite(), warm, RunnerKind::Plain);
    let cold = cold.expect("cold run failed");
    let warm = warm.expect("warm run failed");

    assert!(warm.sync_duration_ms < 40.0);
    assert!((warm.sync_duration_ms - cold.sync_duration_ms).abs() < 30.0);

    let warmups = host.performance().entries_by_name("warmup");
    assert_eq!(warmups.len(), 1);
    assert!(warmups[0].duration >= 50.0);
}

/// Test: a failing step rejects with its own error and never reports
#[test]
fn test_e2e_step_failure_propagates() {
    for method in ["raf", "async"] {
        let host = Host::default();
        let suite = Suite::new("Broken", SuiteType::Default)
            .with_step(Step::sync("Fail", |_| Err(StepError::new("render failed"))));
        let params = RunParameters {
            measurement_method: method.to_string(),
            ..RunParameters::default()
        };

        let (result, reports) = run_single(&host, suite, params, RunnerKind::Plain);
        assert_eq!(
            result,
            Err(HarnessError::Step(StepError::new("render failed"))),
            "method {}",
            method
        );
        assert_eq!(reports, 0);
    }
}

/// Test: a pending result that rejects after the sync phase still fails the step
#[test]
fn test_e2e_pending_rejection_propagates() {
    let host = Host::default();
    let suite = Suite::new("Broken", SuiteType::Async).with_step(Step::with_pending(
        "Reject",
        |_| async { Err(StepError::new("late failure")) },
    ));

    let (result, reports) = run_single(&host, suite, RunParameters::default(), RunnerKind::Plain);
    assert_eq!(result.unwrap_err().step_error(), Some(&StepError::new("late failure")));
    assert_eq!(reports, 0);
}

/// Test: unknown strategy fails before anything is scheduled
#[test]
fn test_e2e_bogus_method_fails_immediately() {
    let host = Host::default();
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let suite = Rc::new(Suite::new("S", SuiteType::Default).with_step(Step::sync("A", move |_| {
        flag.set(true);
        Ok(())
    })));
    let params = RunParameters {
        measurement_method: "bogus".to_string(),
        ..RunParameters::default()
    };
    let runner = StepRunner::new(
        &host,
        None,
        params,
        suite.clone(),
        suite.steps()[0].clone(),
        RunnerKind::Plain,
    );

    let promise = runner.run_step(|_, m| m);
    assert!(promise.is_settled());
    assert!(host.event_loop().is_idle());
    assert_eq!(
        promise.try_take(),
        Some(Err(HarnessError::UnknownMeasurementMethod("bogus".to_string())))
    );
    assert!(!ran.get());
    assert!(host.performance().entries().is_empty());
}

/// Test: every mark and measure of a run lands on the timeline
#[test]
fn test_e2e_timeline_entries() {
    let host = Host::default();
    let suite = Suite::new("Todo", SuiteType::Default).with_step(Step::sync("Add", |_| Ok(())));
    let (result, _) = run_single(&host, suite, RunParameters::default(), RunnerKind::Plain);
    let measurement = result.expect("step failed");

    let performance = host.performance();
    for mark in ["Todo.Add-start", "Todo.Add-sync-end", "Todo.Add-async-end"] {
        assert_eq!(performance.entries_by_name(mark).len(), 1, "{}", mark);
    }
    let sync = performance.entries_by_name("Todo.Add-sync");
    let async_measure = performance.entries_by_name("Todo.Add-async");
    assert_eq!(sync.len(), 1);
    assert_eq!(async_measure.len(), 1);
    assert!((async_measure[0].duration - measurement.async_duration_ms).abs() < 0.01);
}

/// Test: suppressed rendering is reported as a stalled host, not swallowed
#[test]
fn test_e2e_suppressed_rendering_stalls() {
    let host = Host::default();
    host.event_loop().set_rendering_suppressed(true);
    let suite = Suite::new("S", SuiteType::Default).with_step(Step::sync("A", |_| Ok(())));

    let (result, reports) = run_single(&host, suite, RunParameters::default(), RunnerKind::Plain);
    assert_eq!(result, Err(HarnessError::HostStalled));
    assert_eq!(reports, 0);
}

/// Test: the driver watchdog fails a step that never settles
#[test]
fn test_e2e_driver_watchdog() {
    let host = Host::default();
    let timers = host.event_loop().clone();
    let suite = Rc::new(Suite::new("Slow", SuiteType::Async).with_step(Step::with_pending(
        "Forever",
        move |_| {
            let sleep = timers.delay(Duration::from_secs(60));
            async move {
                sleep.await;
                Ok(())
            }
        },
    )));

    let driver = SuiteDriver::new(host, RunParameters::default())
        .with_step_timeout(Some(Duration::from_millis(50)));
    match driver.run_suite(&suite, 0) {
        Err(HarnessError::TimedOut { elapsed_ms }) => assert!(elapsed_ms >= 50.0),
        other => panic!("expected timeout, got {:?}", other),
    }
}

/// Test: built-in suites run end to end through the driver
#[test]
fn test_e2e_builtin_suites() {
    let host = Host::default();
    let suites = step_timing::workloads::create_suites(host.event_loop());
    let steps: usize = suites.iter().map(|s| s.steps().len()).sum();

    let driver = SuiteDriver::new(host, RunParameters::default());
    let reports = driver.run_suites(&suites).expect("built-in suites failed");

    assert_eq!(reports.len(), steps);
    for report in &reports {
        assert!(report.sync_duration_ms >= 0.0, "{:?}", report);
        assert!(report.async_duration_ms >= 0.0, "{:?}", report);
    }
    // Forced layout of the layout suite is charged to the async phase
    let add_items = reports.iter().find(|r| r.step == "AddItems").unwrap();
    assert!(add_items.async_duration_ms >= 2.0);
}
