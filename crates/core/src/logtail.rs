// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log tail: per-job capture buffer for log records
//!
//! Appenders and readers may live on different threads. Appends are
//! serialized behind a mutex so a record is only ever visible fully built,
//! and a bounded tail evicts its oldest record first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Severity of a captured record, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// True if `self` is at least as severe as `threshold`
    pub fn at_least(self, threshold: LogLevel) -> bool {
        self <= threshold
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        };
        f.write_str(s)
    }
}

/// One captured log statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Rendered error attached to the statement, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
            error: None,
            target: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Default)]
struct TailState {
    records: VecDeque<LogRecord>,
    appended: u64,
}

/// Thread-safe, append-only record buffer
#[derive(Debug)]
pub struct LogTail {
    state: Mutex<TailState>,
    capacity: Option<usize>,
}

impl LogTail {
    /// Create a tail retaining at most `capacity` records, or everything for `None`.
    /// A capacity of zero retains one record.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(TailState::default()),
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn append(&self, record: LogRecord) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(capacity) = self.capacity {
            while state.records.len() >= capacity {
                state.records.pop_front();
            }
        }
        state.records.push_back(record);
        state.appended += 1;
    }

    /// Point-in-time copy of the retained records, oldest first
    pub fn snapshot(&self) -> Vec<LogRecord> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total records ever appended, including evicted ones
    pub fn appended(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .appended
    }

    /// Records dropped by eviction
    pub fn evicted(&self) -> u64 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.appended - state.records.len() as u64
    }

    pub fn last(&self) -> Option<LogRecord> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .back()
            .cloned()
    }

    /// True if any retained record is at least as severe as `level`
    pub fn has_level(&self, level: LogLevel) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .iter()
            .any(|r| r.level.at_least(level))
    }

    /// Retained records at least as severe as `level`
    pub fn filter(&self, level: LogLevel) -> Vec<LogRecord> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .iter()
            .filter(|r| r.level.at_least(level))
            .cloned()
            .collect()
    }
}

impl Default for LogTail {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
#[path = "logtail_tests.rs"]
mod tests;
