// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit trail listener

use super::event::Event;
use super::listener::{Listener, ListenerError};
use super::subscription::{EventPattern, Subscription};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

/// A logged event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number
    pub sequence: u64,
    /// Milliseconds since the log was opened
    pub timestamp_ms: u64,
    pub kind: String,
    pub event: Event,
}

/// Listener appending every matching event to a JSON-lines file
pub struct AuditLog {
    subscription: Subscription,
    path: PathBuf,
    sequence: Mutex<u64>,
    start_time: Instant,
}

impl AuditLog {
    /// Open or create an audit log recording every event
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        Self::open_filtered(path, vec![EventPattern::any()])
    }

    /// Open or create an audit log recording events matching `patterns`
    pub fn open_filtered(path: PathBuf, patterns: Vec<EventPattern>) -> std::io::Result<Self> {
        // Continue numbering after existing entries
        let sequence = if path.exists() {
            let file = File::open(&path)?;
            BufReader::new(file).lines().count() as u64
        } else {
            0
        };

        Ok(Self {
            subscription: Subscription::new("audit", patterns, "Audit trail of events"),
            path,
            sequence: Mutex::new(sequence),
            start_time: Instant::now(),
        })
    }

    /// Append an event to the log
    pub fn append(&self, event: &Event) -> std::io::Result<EventRecord> {
        let mut sequence = self.sequence.lock().unwrap_or_else(|e| e.into_inner());

        let record = EventRecord {
            sequence: *sequence + 1,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind: event.kind.clone(),
            event: event.clone(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{}", json)?;

        *sequence = record.sequence;
        Ok(record)
    }

    /// Read all events from the log
    pub fn read_all(&self) -> std::io::Result<Vec<EventRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let file = File::open(&self.path)?;
        let mut records = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: EventRecord = serde_json::from_str(&line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            records.push(record);
        }

        Ok(records)
    }

    /// Query events by kind pattern
    pub fn query(&self, pattern: &EventPattern) -> std::io::Result<Vec<EventRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| pattern.matches(&r.kind))
            .collect())
    }

    /// Query events after a sequence number
    pub fn after(&self, sequence: u64) -> std::io::Result<Vec<EventRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.sequence > sequence)
            .collect())
    }

    pub fn current_sequence(&self) -> u64 {
        *self.sequence.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Listener for AuditLog {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        self.append(event)
            .map(|_| ())
            .map_err(|e| ListenerError::failed(format!("audit write failed: {e}")))
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
