// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing-backed log capture
//!
//! Every job body runs inside a `job` span carrying a `job_id` field.
//! [`LogCaptureLayer`] routes each tracing event to the tail registered for
//! the innermost enclosing job span; events outside any job span are left
//! to the other layers.

use burrow_core::{CaptureTarget, JobId, LogCapture, LogLevel, LogRecord};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Name of the span the job runner opens around a job body
pub const JOB_SPAN: &str = "job";

/// Directory of attached log tails, keyed by job id
///
/// Captured records are stamped with the clock of the status that attached
/// the tail, so direct and captured records share one time source.
#[derive(Clone, Default)]
pub struct CaptureRegistry {
    targets: Arc<RwLock<HashMap<JobId, CaptureTarget>>>,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer routing tracing events into the attached tails
    pub fn layer(&self) -> LogCaptureLayer {
        LogCaptureLayer {
            registry: self.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to the job's tail if it is attached and the level passes its threshold
    fn route(&self, job: &JobId, level: LogLevel, fields: FieldVisitor, target: &str) -> bool {
        let targets = self.targets.read().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = targets.get(job) else {
            return false;
        };
        if !level.at_least(entry.threshold) {
            return false;
        }

        let (message, error) = fields.into_parts();
        let mut record = LogRecord::new(level, message, entry.clock.now()).with_target(target);
        if let Some(error) = error {
            record = record.with_error(error);
        }
        entry.tail.append(record);
        true
    }
}

impl fmt::Debug for CaptureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureRegistry")
            .field("attached", &self.len())
            .finish()
    }
}

impl LogCapture for CaptureRegistry {
    fn attach(&self, job: &JobId, target: CaptureTarget) -> bool {
        let mut targets = self.targets.write().unwrap_or_else(|e| e.into_inner());
        match targets.entry(job.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(target);
                true
            }
        }
    }

    fn detach(&self, job: &JobId) {
        self.targets
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job);
    }

    fn is_attached(&self, job: &JobId) -> bool {
        self.targets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(job)
    }
}

/// Job id stored in the extensions of a `job` span
struct JobSpan(JobId);

/// `tracing_subscriber` layer feeding job log tails
pub struct LogCaptureLayer {
    registry: CaptureRegistry,
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != JOB_SPAN {
            return;
        }
        let mut visitor = JobIdVisitor(None);
        attrs.record(&mut visitor);
        if let (Some(job_id), Some(span)) = (visitor.0, ctx.span(id)) {
            span.extensions_mut().insert(JobSpan(JobId(job_id)));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(scope) = ctx.event_scope(event) else {
            return;
        };
        // Scope iterates from the innermost span outwards
        let job = scope.into_iter().find_map(|span| {
            let extensions = span.extensions();
            extensions.get::<JobSpan>().map(|j| j.0.clone())
        });
        let Some(job) = job else {
            return;
        };

        let metadata = event.metadata();
        let mut fields = FieldVisitor::default();
        event.record(&mut fields);
        self.registry
            .route(&job, level_of(metadata.level()), fields, metadata.target());
    }
}

impl fmt::Debug for LogCaptureLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCaptureLayer")
            .field("registry", &self.registry)
            .finish()
    }
}

fn level_of(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        Level::TRACE => LogLevel::Trace,
    }
}

struct JobIdVisitor(Option<String>);

impl Visit for JobIdVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "job_id" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "job_id" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

/// Collects an event's message, `error` field and remaining fields
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    error: Option<String>,
    extra: Vec<String>,
}

impl FieldVisitor {
    /// Message with the remaining fields appended as `key=value`
    fn into_parts(self) -> (String, Option<String>) {
        let mut message = self.message.unwrap_or_default();
        for field in self.extra {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(&field);
        }
        (message, self.error)
    }

    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "error" => self.error = Some(value),
            name => self.extra.push(format!("{}={}", name, value)),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
