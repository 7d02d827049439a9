// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Burrow job execution engine
//!
//! Wires the core job model to a tokio runtime: job-type registry, an
//! executor running each job on its own task, tracing-based log capture
//! and engine configuration.

pub mod capture;
mod config;
mod executor;
mod listeners;
pub mod logging;
mod registry;

pub use capture::{CaptureRegistry, LogCaptureLayer, JOB_SPAN};
pub use config::{ConfigError, EngineConfig};
pub use executor::{ExecutorError, JobExecutor, JobHandle, JobTable, ShutdownReport};
pub use listeners::CancelOnRequest;
pub use registry::JobRegistry;
