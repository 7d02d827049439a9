// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener trait and the stock listener adapters

use super::bus::EventSender;
use super::event::Event;
use super::subscription::Subscription;
use thiserror::Error;

/// Errors a listener may report back to the bus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    #[error("{0}")]
    Failed(String),
    #[error("listener channel closed")]
    Disconnected,
}

impl ListenerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ListenerError::Failed(reason.into())
    }
}

/// An observer registered on an [`EventBus`](super::EventBus)
///
/// Listeners run synchronously on the publishing thread; keep them short.
pub trait Listener: Send + Sync {
    /// Name and interest set; the name is the listener's identity on the bus
    fn subscription(&self) -> &Subscription;

    fn on_event(&self, event: &Event) -> Result<(), ListenerError>;
}

/// Listener backed by a closure
pub struct FnListener<F> {
    subscription: Subscription,
    f: F,
}

impl<F> FnListener<F>
where
    F: Fn(&Event) -> Result<(), ListenerError> + Send + Sync,
{
    pub fn new(subscription: Subscription, f: F) -> Self {
        Self { subscription, f }
    }
}

impl<F> Listener for FnListener<F>
where
    F: Fn(&Event) -> Result<(), ListenerError> + Send + Sync,
{
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        (self.f)(event)
    }
}

/// Listener that forwards matching events into an unbounded channel
///
/// Lets async code await events without running inside the dispatch.
pub struct ChannelListener {
    subscription: Subscription,
    tx: EventSender,
}

impl ChannelListener {
    pub fn new(subscription: Subscription, tx: EventSender) -> Self {
        Self { subscription, tx }
    }
}

impl Listener for ChannelListener {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        self.tx
            .send(event.clone())
            .map_err(|_| ListenerError::Disconnected)
    }
}
