//! Async runtime for the step-timing harness.
//!
//! This crate provides the single-threaded host event loop that benchmark
//! steps and their invokers are scheduled on:
//! - Event loop with task and microtask queues, timers, and animation frames
//! - Promises that spawned futures resolve and other futures await
//! - Message channels whose deliveries are queued as tasks
//!
//! # Overview
//!
//! - [`EventLoop`] - Main event loop coordinating task execution
//! - [`Promise`] - Single-consumer pending result
//! - [`MessageChannel`] - Pair of entangled message ports
//!
//! # Examples
//!
//! ## Event Loop Usage
//!
//! ```
//! use async_runtime::EventLoop;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::new();
//! let fired = Rc::new(Cell::new(false));
//!
//! let f = fired.clone();
//! event_loop.set_timeout(Duration::ZERO, move || f.set(true));
//! event_loop.run_until_idle();
//! assert!(fired.get());
//! ```
//!
//! ## Promise Usage
//!
//! ```
//! use async_runtime::{EventLoop, next_microtask};
//!
//! let event_loop = EventLoop::new();
//! let promise = event_loop.spawn(async {
//!     next_microtask().await;
//!     "settled"
//! });
//! assert!(!promise.is_settled());
//! assert_eq!(event_loop.block_on(promise, None).unwrap(), "settled");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event_loop;
pub mod message_channel;
pub mod promise;
pub mod task_queue;

// Re-export main types at crate root
pub use event_loop::{
    next_microtask, Clock, EventLoop, EventLoopConfig, FrameRequestId, NextMicrotask, TimerId,
};
pub use message_channel::{MessageChannel, MessageEvent, MessagePort};
pub use promise::{LocalFuture, Promise, Resolver};
pub use task_queue::{MicrotaskQueue, Task, TaskId, TaskQueue, TaskSource};
