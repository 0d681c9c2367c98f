//! Entangled message ports.
//!
//! Posting on one port queues a `PostedMessage` task that delivers the data to
//! the other port. A port buffers incoming messages until [`MessagePort::start`]
//! is called, after which every delivery is dispatched to the port's listeners.

use crate::event_loop::EventLoop;
use crate::task_queue::{Task, TaskSource};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// A message delivered to a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// The posted data
    pub data: String,
}

enum Listener {
    Once(Box<dyn FnOnce(&MessageEvent)>),
    Persistent(Box<dyn FnMut(&MessageEvent)>),
}

struct PortState {
    event_loop: EventLoop,
    entangled: RefCell<Weak<PortState>>,
    listeners: RefCell<Vec<Listener>>,
    started: Cell<bool>,
    buffered: RefCell<VecDeque<MessageEvent>>,
}

impl PortState {
    fn receive(self: &Rc<Self>, event: MessageEvent) {
        if self.started.get() {
            self.dispatch(&event);
        } else {
            self.buffered.borrow_mut().push_back(event);
        }
    }

    fn dispatch(&self, event: &MessageEvent) {
        // Listeners added while dispatching are not called for this event.
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        let mut kept = Vec::with_capacity(listeners.len());
        for listener in listeners {
            match listener {
                Listener::Once(callback) => callback(event),
                Listener::Persistent(mut callback) => {
                    callback(event);
                    kept.push(Listener::Persistent(callback));
                }
            }
        }
        let mut listeners = self.listeners.borrow_mut();
        kept.append(&mut listeners);
        *listeners = kept;
    }
}

/// One end of a [`MessageChannel`].
#[derive(Clone)]
pub struct MessagePort {
    state: Rc<PortState>,
}

impl MessagePort {
    fn new(event_loop: &EventLoop) -> Self {
        Self {
            state: Rc::new(PortState {
                event_loop: event_loop.clone(),
                entangled: RefCell::new(Weak::new()),
                listeners: RefCell::new(Vec::new()),
                started: Cell::new(false),
                buffered: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Sends `data` to the entangled port.
    ///
    /// Delivery happens in its own task; if the other port has been dropped,
    /// the message is discarded.
    pub fn post_message(&self, data: impl Into<String>) {
        let Some(target) = self.state.entangled.borrow().upgrade() else {
            tracing::debug!("message posted to a closed port was discarded");
            return;
        };
        let event = MessageEvent { data: data.into() };
        self.state
            .event_loop
            .push_task(Task::new(TaskSource::PostedMessage, move || {
                target.receive(event)
            }));
    }

    /// Adds a listener called for every message delivered to this port.
    pub fn add_listener<F>(&self, f: F)
    where
        F: FnMut(&MessageEvent) + 'static,
    {
        self.state
            .listeners
            .borrow_mut()
            .push(Listener::Persistent(Box::new(f)));
    }

    /// Adds a listener that is removed after the first message it receives.
    pub fn add_listener_once<F>(&self, f: F)
    where
        F: FnOnce(&MessageEvent) + 'static,
    {
        self.state
            .listeners
            .borrow_mut()
            .push(Listener::Once(Box::new(f)));
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    /// Starts dispatching messages; buffered messages are delivered in
    /// later tasks, in the order they arrived. Calling it again is a no-op.
    pub fn start(&self) {
        if self.state.started.replace(true) {
            return;
        }
        let buffered = std::mem::take(&mut *self.state.buffered.borrow_mut());
        for event in buffered {
            let state = self.state.clone();
            self.state
                .event_loop
                .push_task(Task::new(TaskSource::PostedMessage, move || {
                    state.dispatch(&event)
                }));
        }
    }
}

impl std::fmt::Debug for MessagePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePort")
            .field("started", &self.state.started.get())
            .field("listeners", &self.listener_count())
            .field("buffered", &self.state.buffered.borrow().len())
            .finish()
    }
}

/// A pair of entangled message ports.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, MessageChannel};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let event_loop = EventLoop::new();
/// let channel = MessageChannel::new(&event_loop);
/// let received = Rc::new(RefCell::new(Vec::new()));
///
/// let sink = received.clone();
/// channel.port1.add_listener(move |event| sink.borrow_mut().push(event.data.clone()));
/// channel.port1.start();
/// channel.port2.post_message("ping");
///
/// event_loop.run_until_idle();
/// assert_eq!(*received.borrow(), vec!["ping".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct MessageChannel {
    /// The first port
    pub port1: MessagePort,
    /// The second port
    pub port2: MessagePort,
}

impl MessageChannel {
    /// Creates a new channel whose deliveries run on `event_loop`.
    pub fn new(event_loop: &EventLoop) -> Self {
        let port1 = MessagePort::new(event_loop);
        let port2 = MessagePort::new(event_loop);
        *port1.state.entangled.borrow_mut() = Rc::downgrade(&port2.state);
        *port2.state.entangled.borrow_mut() = Rc::downgrade(&port1.state);
        Self { port1, port2 }
    }
}
