//! Notification side-channel for fetch progress.
//!
//! Fetch logic reports through a [`FetchObserver`] and never talks to a UI or
//! logging sink directly. [`EventBus`] fans the two streams out to any number
//! of subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Receives the "operation started" and "message logged" streams
pub trait FetchObserver: Send + Sync {
    /// A fetch began; `operation` is `name@version`
    fn operation_started(&self, operation: &str);

    /// A diagnostic worth surfacing, usually a failure
    fn message_logged(&self, message: &str);
}

impl<T: FetchObserver + ?Sized> FetchObserver for Arc<T> {
    fn operation_started(&self, operation: &str) {
        (**self).operation_started(operation)
    }

    fn message_logged(&self, message: &str) {
        (**self).message_logged(message)
    }
}

/// Forwards notifications to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn operation_started(&self, operation: &str) {
        info!(operation, "Operation started");
    }

    fn message_logged(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Default channel capacity; slow subscribers lag rather than block fetches
pub const DEFAULT_CAPACITY: usize = 64;

/// Broadcasts notifications to independent subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    started: broadcast::Sender<String>,
    messages: broadcast::Sender<String>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (started, _) = broadcast::channel(capacity);
        let (messages, _) = broadcast::channel(capacity);
        Self { started, messages }
    }

    pub fn subscribe_started(&self) -> broadcast::Receiver<String> {
        self.started.subscribe()
    }

    pub fn subscribe_messages(&self) -> broadcast::Receiver<String> {
        self.messages.subscribe()
    }
}

impl FetchObserver for EventBus {
    fn operation_started(&self, operation: &str) {
        // No subscribers is fine
        let _ = self.started.send(operation.to_string());
    }

    fn message_logged(&self, message: &str) {
        let _ = self.messages.send(message.to_string());
    }
}
