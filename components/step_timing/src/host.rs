//! The host a benchmark runs in: event loop, performance timeline, and the
//! message channel the async-ordering invoker uses as a one-shot trigger.

use crate::timing::Performance;
use async_runtime::{EventLoop, EventLoopConfig, MessageChannel};
use std::rc::Rc;

/// Handle to one host context.
///
/// Every step runner created for the same host shares its event loop,
/// timeline, and trigger channel.
#[derive(Debug, Clone)]
pub struct Host {
    event_loop: EventLoop,
    performance: Performance,
    trigger_channel: Rc<MessageChannel>,
}

impl Host {
    /// Creates a host with a fresh event loop.
    pub fn new(config: EventLoopConfig) -> Self {
        Self::with_event_loop(EventLoop::with_config(config))
    }

    /// Creates a host around an existing event loop.
    pub fn with_event_loop(event_loop: EventLoop) -> Self {
        let performance = Performance::new(event_loop.clock());
        let trigger_channel = Rc::new(MessageChannel::new(&event_loop));
        Self {
            event_loop,
            performance,
            trigger_channel,
        }
    }

    /// The host event loop.
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// The host performance timeline.
    pub fn performance(&self) -> &Performance {
        &self.performance
    }

    /// The channel shared by every async-ordering invocation on this host.
    pub fn trigger_channel(&self) -> &MessageChannel {
        &self.trigger_channel
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(EventLoopConfig::default())
    }
}
