//! Unit tests for EventLoop

use async_runtime::{next_microtask, EventLoop, EventLoopConfig};
use core_types::HarnessError;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

fn recorder() -> Rc<RefCell<Vec<&'static str>>> {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn new_event_loop_has_empty_task_queue() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_task_queue_empty());
}

#[test]
fn new_event_loop_has_empty_microtask_queue() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_microtask_queue_empty());
}

#[test]
fn task_queue_fifo_order() {
    let event_loop = EventLoop::new();
    let order = recorder();

    let o = order.clone();
    event_loop.enqueue_task(move || o.borrow_mut().push("first"));
    let o = order.clone();
    event_loop.enqueue_task(move || o.borrow_mut().push("second"));

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec!["first", "second"]);
}

#[test]
fn microtasks_queued_during_checkpoint_drain_in_same_checkpoint() {
    let event_loop = EventLoop::new();
    let order = recorder();

    let o = order.clone();
    let el = event_loop.clone();
    event_loop.queue_microtask(move || {
        o.borrow_mut().push("outer");
        let inner = o.clone();
        el.queue_microtask(move || inner.borrow_mut().push("inner"));
    });

    event_loop.perform_microtask_checkpoint();
    assert_eq!(*order.borrow(), vec!["outer", "inner"]);
}

#[test]
fn timers_with_equal_delay_fire_in_insertion_order() {
    let event_loop = EventLoop::new();
    let order = recorder();

    for label in ["a", "b", "c"] {
        let o = order.clone();
        event_loop.set_timeout(Duration::ZERO, move || o.borrow_mut().push(label));
    }

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn timer_respects_delay() {
    let event_loop = EventLoop::new();
    let start = Instant::now();
    let promise = event_loop.delay(Duration::from_millis(20));
    event_loop.block_on(promise, None).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn cleared_timer_never_fires() {
    let event_loop = EventLoop::new();
    let order = recorder();

    let o = order.clone();
    let id = event_loop.set_timeout(Duration::ZERO, move || o.borrow_mut().push("fired"));
    event_loop.clear_timeout(id);

    event_loop.run_until_idle();
    assert!(order.borrow().is_empty());
    assert_eq!(event_loop.pending_timers(), 0);
}

#[test]
fn frame_callbacks_run_in_registration_order_within_one_frame() {
    let event_loop = EventLoop::new();
    let order = recorder();

    let o = order.clone();
    event_loop.request_animation_frame(move |_| o.borrow_mut().push("first"));
    let o = order.clone();
    event_loop.request_animation_frame(move |_| o.borrow_mut().push("second"));

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec!["first", "second"]);
    assert_eq!(event_loop.frames_rendered(), 1);
}

#[test]
fn microtasks_drain_between_frame_callbacks() {
    let event_loop = EventLoop::new();
    let order = recorder();

    let o = order.clone();
    let el = event_loop.clone();
    event_loop.request_animation_frame(move |_| {
        o.borrow_mut().push("frame-1");
        let inner = o.clone();
        el.queue_microtask(move || inner.borrow_mut().push("microtask"));
    });
    let o = order.clone();
    event_loop.request_animation_frame(move |_| o.borrow_mut().push("frame-2"));

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec!["frame-1", "microtask", "frame-2"]);
}

#[test]
fn frame_requested_during_update_waits_for_next_frame() {
    let event_loop = EventLoop::with_config(EventLoopConfig {
        frame_interval: Duration::from_millis(5),
    });
    let timestamps = Rc::new(RefCell::new(Vec::new()));

    let t = timestamps.clone();
    let el = event_loop.clone();
    event_loop.request_animation_frame(move |first| {
        t.borrow_mut().push(first);
        let t = t.clone();
        el.request_animation_frame(move |second| t.borrow_mut().push(second));
    });

    event_loop.run_until_idle();
    let timestamps = timestamps.borrow();
    assert_eq!(timestamps.len(), 2);
    assert!(timestamps[1] > timestamps[0]);
    assert_eq!(event_loop.frames_rendered(), 2);
}

#[test]
fn cancelled_frame_callback_never_runs() {
    let event_loop = EventLoop::new();
    let order = recorder();

    let o = order.clone();
    let id = event_loop.request_animation_frame(move |_| o.borrow_mut().push("frame"));
    event_loop.cancel_animation_frame(id);

    event_loop.run_until_idle();
    assert!(order.borrow().is_empty());
}

#[test]
fn awaiting_frames_and_timers_from_spawned_future() {
    let event_loop = EventLoop::new();
    let el = event_loop.clone();
    let promise = event_loop.spawn(async move {
        let first = el.animation_frame().await;
        el.delay(Duration::from_millis(2)).await;
        let second = el.animation_frame().await;
        second - first
    });

    let elapsed = event_loop.block_on(promise, None).unwrap();
    assert!(elapsed > 0.0);
}

#[test]
fn next_microtask_yields_behind_queued_microtasks() {
    let event_loop = EventLoop::new();
    let order = recorder();

    let o = order.clone();
    let el = event_loop.clone();
    event_loop.enqueue_task(move || {
        let spawned = o.clone();
        el.spawn(async move {
            next_microtask().await;
            spawned.borrow_mut().push("resumed");
        });
        let queued = o.clone();
        el.queue_microtask(move || queued.borrow_mut().push("queued"));
    });

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec!["queued", "resumed"]);
}

#[test]
fn suppressed_rendering_stalls_block_on() {
    let event_loop = EventLoop::new();
    event_loop.set_rendering_suppressed(true);
    let promise = event_loop.animation_frame();

    assert_eq!(
        event_loop.block_on(promise, None),
        Err(HarnessError::HostStalled)
    );
    assert_eq!(event_loop.pending_frame_requests(), 1);
}

#[test]
fn block_on_times_out() {
    let event_loop = EventLoop::new();
    let promise = event_loop.delay(Duration::from_secs(5));

    let result = event_loop.block_on(promise, Some(Duration::from_millis(10)));
    assert!(matches!(result, Err(HarnessError::TimedOut { .. })));
}
