// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging manager seam: routes a job body's log statements into its tail

use crate::clock::Clock;
use crate::id::JobId;
use crate::logtail::{LogLevel, LogTail};
use std::sync::Arc;

/// Where one job's captured records go
#[derive(Clone)]
pub struct CaptureTarget {
    pub tail: Arc<LogTail>,
    /// Least severe level kept
    pub threshold: LogLevel,
    /// Stamps captured records; the owning status's clock
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CaptureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureTarget")
            .field("threshold", &self.threshold)
            .field("records", &self.tail.len())
            .finish_non_exhaustive()
    }
}

/// Routes log statements issued while a job runs into that job's tail
///
/// A status attaches its tail when it is constructed and detaches it when
/// it reaches a terminal state. A job id has at most one attached tail.
pub trait LogCapture: Send + Sync {
    /// Start routing records for `job` into `target`.
    ///
    /// Returns false, leaving the existing target in place, when `job`
    /// already has one.
    fn attach(&self, job: &JobId, target: CaptureTarget) -> bool;

    fn detach(&self, job: &JobId);

    fn is_attached(&self, job: &JobId) -> bool;
}

/// Capture that routes nothing; records only arrive through direct status logging
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCapture;

impl LogCapture for NoCapture {
    fn attach(&self, _job: &JobId, _target: CaptureTarget) -> bool {
        true
    }

    fn detach(&self, _job: &JobId) {}

    fn is_attached(&self, _job: &JobId) -> bool {
        false
    }
}
