//! Single-threaded promises.
//!
//! A [`Promise`] is the pending result of some scheduled work. It is settled
//! exactly once through its [`Resolver`] and can be awaited by a task spawned
//! on the [`EventLoop`](crate::EventLoop). Awaiting tasks are woken through the
//! microtask queue, so reactions to a settled promise run as microtasks.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// A boxed, non-`Send` future, the unit of work the event loop polls.
pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T>>>;

struct Slot<T> {
    value: Option<T>,
    settled: bool,
    waiters: Vec<Waker>,
}

/// The pending result of scheduled work.
///
/// # Examples
///
/// ```
/// use async_runtime::Promise;
///
/// let (resolver, promise) = Promise::pending();
/// assert!(!promise.is_settled());
///
/// resolver.resolve(42);
/// assert!(promise.is_settled());
/// assert_eq!(promise.try_take(), Some(42));
/// ```
pub struct Promise<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

/// The settling half of a [`Promise`].
///
/// Dropping a resolver without calling [`Resolver::resolve`] leaves the
/// promise pending forever.
pub struct Resolver<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Promise<T> {
    /// Creates a pending promise together with its resolver.
    pub fn pending() -> (Resolver<T>, Promise<T>) {
        let slot = Rc::new(RefCell::new(Slot {
            value: None,
            settled: false,
            waiters: Vec::new(),
        }));
        (Resolver { slot: slot.clone() }, Promise { slot })
    }

    /// Creates a promise that is already settled with `value`.
    pub fn resolved(value: T) -> Promise<T> {
        let (resolver, promise) = Promise::pending();
        resolver.resolve(value);
        promise
    }

    /// Returns true once the promise has been settled.
    pub fn is_settled(&self) -> bool {
        self.slot.borrow().settled
    }

    /// Takes the settled value, if any.
    ///
    /// The value can be taken only once; later calls return `None`.
    pub fn try_take(&self) -> Option<T> {
        self.slot.borrow_mut().value.take()
    }
}

impl<T> Resolver<T> {
    /// Settles the promise and wakes every task awaiting it.
    pub fn resolve(self, value: T) {
        let waiters = {
            let mut slot = self.slot.borrow_mut();
            slot.value = Some(value);
            slot.settled = true;
            std::mem::take(&mut slot.waiters)
        };
        for waker in waiters {
            waker.wake();
        }
    }
}

impl<T> Future for Promise<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut slot = self.slot.borrow_mut();
        match slot.value.take() {
            Some(value) => Poll::Ready(value),
            None => {
                if !slot.waiters.iter().any(|w| w.will_wake(cx.waker())) {
                    slot.waiters.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_settled() {
            write!(f, "Promise {{ <settled> }}")
        } else {
            write!(f, "Promise {{ <pending> }}")
        }
    }
}

impl<T> std::fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Resolver {{ ... }}")
    }
}
