// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for dispatching events to listeners
//!
//! Dispatch is synchronous: every interested listener runs on the
//! publisher's thread, in registration order, before `dispatch` returns.
//! A listener that errors or panics is reported and skipped; it never stops
//! the remaining listeners and never reaches the publisher.

use super::event::Event;
use super::listener::{ChannelListener, Listener};
use super::subscription::{SubscriberId, Subscription};
use crate::panic::panic_message;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

/// Sender for channel-backed listeners
pub type EventSender = mpsc::UnboundedSender<Event>;
/// Receiver for channel-backed listeners
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// One listener that failed while handling an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listener {listener} failed on {kind}: {reason}")]
pub struct DispatchFailure {
    pub listener: String,
    pub kind: String,
    pub reason: String,
}

/// Outcome of a single dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that handled the event without error
    pub delivered: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Registered {
    id: SubscriberId,
    listener: Arc<dyn Listener>,
}

/// The event bus routes events to interested listeners
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Vec<Registered>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under its subscription name.
    ///
    /// Re-registering a name replaces the previous listener in place and
    /// returns it.
    pub fn register(&self, listener: Arc<dyn Listener>) -> Option<Arc<dyn Listener>> {
        let id = listener.subscription().id.clone();
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = listeners.iter_mut().find(|r| r.id == id) {
            tracing::debug!(listener = %id, "replacing listener");
            return Some(std::mem::replace(&mut existing.listener, listener));
        }

        tracing::debug!(listener = %id, "registering listener");
        listeners.push(Registered { id, listener });
        None
    }

    /// Remove a listener by name. Removing an unknown name is a no-op.
    pub fn unregister(&self, name: &str) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|r| r.id.0 != name);
        before != listeners.len()
    }

    /// Subscribe a channel to events matching the subscription
    pub fn subscribe(&self, subscription: Subscription) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(Arc::new(ChannelListener::new(subscription, tx)));
        rx
    }

    /// Build an event and dispatch it
    pub fn notify(&self, kind: &str, source: impl Into<String>, data: Value) -> DispatchReport {
        self.dispatch(&Event::new(kind, source, data))
    }

    /// Deliver an event to every interested listener, in registration order
    pub fn dispatch(&self, event: &Event) -> DispatchReport {
        // Snapshot so listeners may (un)register without deadlocking
        let targets: Vec<Arc<dyn Listener>> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            listeners
                .iter()
                .filter(|r| r.listener.subscription().matches(&event.kind))
                .map(|r| Arc::clone(&r.listener))
                .collect()
        };

        let mut report = DispatchReport::default();
        for listener in targets {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            let reason = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };

            let name = listener.subscription().id.0.clone();
            tracing::warn!(
                listener = %name,
                kind = %event.kind,
                error = %reason,
                "listener failed"
            );
            report.failures.push(DispatchFailure {
                listener: name,
                kind: event.kind.clone(),
                reason,
            });
        }

        report
    }

    /// Get count of registered listeners
    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Listener names in registration order
    pub fn list_listeners(&self) -> Vec<SubscriberId> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.list_listeners())
            .finish()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
