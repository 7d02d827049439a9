// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events system: synchronous publish/subscribe for job lifecycle and domain events
//!
//! This module provides:
//! - `EventBus` - Dispatch events to interested listeners on the publishing thread
//! - `Listener` - What a subscriber implements (name, interests, handler)
//! - `EventPattern` - Pattern matching on `:`-separated event kinds
//! - `AuditLog` - Listener that keeps a JSON-lines trail of events

mod audit;
mod bus;
mod event;
mod listener;
mod subscription;

pub use audit::{AuditLog, EventRecord};
pub use bus::{DispatchFailure, DispatchReport, EventBus, EventReceiver, EventSender};
pub use event::{kinds, Event};
pub use listener::{ChannelListener, FnListener, Listener, ListenerError};
pub use subscription::{EventPattern, SubscriberId, Subscription};
