//! Unit tests for MessageChannel

use async_runtime::{EventLoop, MessageChannel};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn message_delivered_to_other_port() {
    let event_loop = EventLoop::new();
    let channel = MessageChannel::new(&event_loop);
    let received = Rc::new(RefCell::new(Vec::new()));

    let r = received.clone();
    channel.port2.add_listener(move |event| r.borrow_mut().push(event.data.clone()));
    channel.port2.start();
    channel.port1.post_message("hello");

    event_loop.run_until_idle();
    assert_eq!(*received.borrow(), vec!["hello".to_string()]);
}

#[test]
fn message_posted_before_timer_task_is_delivered_first() {
    let event_loop = EventLoop::new();
    let channel = MessageChannel::new(&event_loop);
    channel.port1.start();
    let order = Rc::new(RefCell::new(Vec::new()));

    let o = order.clone();
    event_loop.set_timeout(Duration::ZERO, move || o.borrow_mut().push("timer"));
    let o = order.clone();
    channel.port1.add_listener_once(move |_| o.borrow_mut().push("message"));
    channel.port2.post_message("trigger");

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec!["message", "timer"]);
}

#[test]
fn once_listeners_from_concurrent_users_each_fire_once() {
    let event_loop = EventLoop::new();
    let channel = MessageChannel::new(&event_loop);
    channel.port1.start();
    let hits = Rc::new(RefCell::new(Vec::new()));

    for user in [1, 2] {
        let h = hits.clone();
        channel.port1.add_listener_once(move |_| h.borrow_mut().push(user));
        channel.port2.post_message("trigger");
    }

    event_loop.run_until_idle();
    assert_eq!(*hits.borrow(), vec![1, 2]);
}

#[test]
fn dropped_port_discards_messages() {
    let event_loop = EventLoop::new();
    let MessageChannel { port1, port2 } = MessageChannel::new(&event_loop);
    drop(port2);

    port1.post_message("lost");
    assert!(event_loop.is_task_queue_empty());
}
