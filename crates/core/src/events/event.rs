// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event payload

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle event kinds published by jobs
pub mod kinds {
    pub const JOB_STARTING: &str = "job:starting";
    pub const JOB_RUNNING: &str = "job:running";
    pub const JOB_PROGRESS: &str = "job:progress";
    pub const JOB_CANCEL_REQUESTED: &str = "job:cancel-requested";
    pub const JOB_FINISHED: &str = "job:finished";
    pub const JOB_CANCELED: &str = "job:canceled";
    pub const JOB_FAILED: &str = "job:failed";
    /// Request to cancel the job named by `data.job_id`
    pub const JOB_CANCEL: &str = "job:cancel";
}

/// Something that happened, as seen by listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// `:`-separated kind, e.g. `job:finished`
    pub kind: String,
    /// Identity of the publisher (a job id for lifecycle events)
    pub source: String,
    #[serde(default)]
    pub data: Value,
}

impl Event {
    pub fn new(kind: impl Into<String>, source: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            data,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Read a string field from the payload
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}
