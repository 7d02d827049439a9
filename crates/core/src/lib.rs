// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! burrow-core: data model and state machines for the Burrow job engine
//!
//! This crate provides:
//! - Execution contexts with inheritance and finality rules
//! - Per-job log tails, bounded or unbounded
//! - The serializability gate consulted when statuses are externalized
//! - A synchronous event bus with channel and audit-log listeners
//! - Job statuses, the `Job` trait and the runner that drives a job's lifecycle

pub mod capture;
pub mod clock;
pub mod context;
pub mod env;
pub mod events;
pub mod gate;
pub mod id;
pub mod job;
pub mod logtail;
pub mod progress;
pub mod request;
pub mod status;

mod panic;

pub use capture::{CaptureTarget, LogCapture, NoCapture};
pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{ContextError, Declaration, Execution, ExecutionContext, Property};
pub use env::{JobEnv, DEFAULT_LOG_CAPACITY};
pub use events::{
    kinds, AuditLog, ChannelListener, DispatchFailure, DispatchReport, Event, EventBus,
    EventPattern, EventReceiver, FnListener, Listener, ListenerError, Subscription,
};
pub use gate::{
    FnCheck, SerializabilityCheck, SerializabilityGate, Subject, TypeNamePrefix, TypeRule, Verdict,
};
pub use id::{IdGen, JobId, SequentialIdGen, UuidIdGen};
pub use job::{Job, JobError, JobRunner, JobScope, JOB_ID_PROPERTY};
pub use logtail::{LogLevel, LogRecord, LogTail};
pub use progress::Progress;
pub use request::Request;
pub use status::{
    FailureKind, JobFailure, JobState, JobStatus, StatusSnapshot, StatusView, Transition,
};
