// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status: lifecycle state machine, progress, log tail and outcome
//!
//! ```text
//! NONE ──initialize──► QUEUED ──start──► RUNNING ──complete──► FINISHED
//!                                           │ ├──cancel──────► CANCELED
//!                                           │ └──fail────────► FAILED
//! ```
//!
//! Terminal states absorb every further transition; an illegal transition
//! is logged and ignored, never raised.

use crate::capture::{CaptureTarget, LogCapture};
use crate::clock::Clock;
use crate::env::JobEnv;
use crate::events::{kinds, DispatchReport, EventBus};
use crate::gate::{SerializabilityGate, Subject};
use crate::id::JobId;
use crate::logtail::{LogLevel, LogRecord, LogTail};
use crate::progress::Progress;
use crate::request::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    None,
    Queued,
    Running,
    Finished,
    Canceled,
    Failed,
}

/// Inputs that move a job between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enqueue,
    Start,
    Complete,
    Cancel,
    Fail,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Canceled | JobState::Failed
        )
    }

    /// Pure transition table; `None` means the transition is illegal
    pub fn next(self, transition: Transition) -> Option<JobState> {
        match (self, transition) {
            (JobState::None, Transition::Enqueue) => Some(JobState::Queued),
            (JobState::Queued, Transition::Start) => Some(JobState::Running),
            (JobState::Running, Transition::Complete) => Some(JobState::Finished),
            (JobState::Running, Transition::Cancel) => Some(JobState::Canceled),
            (JobState::Running, Transition::Fail) => Some(JobState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::None => "NONE",
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Finished => "FINISHED",
            JobState::Canceled => "CANCELED",
            JobState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// How a failed job went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The body returned an error
    Error,
    /// The body panicked
    Panic,
}

/// Terminal failure cause recorded on a `FAILED` status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: message.into(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panic,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FailureKind::Error => write!(f, "{}", self.message),
            FailureKind::Panic => write!(f, "panicked: {}", self.message),
        }
    }
}

/// Access to the common status inside a job-type-specific status
pub trait StatusView: Any + Send + Sync {
    fn base(&self) -> &JobStatus;
}

impl StatusView for JobStatus {
    fn base(&self) -> &JobStatus {
        self
    }
}

trait Attachment: Send + Sync {
    fn subject(&self) -> Subject<'_>;
    fn to_json(&self) -> serde_json::Result<Value>;
}

struct Attached<T>(T);

impl<T: Serialize + Any + Send + Sync> Attachment for Attached<T> {
    fn subject(&self) -> Subject<'_> {
        Subject::object(&self.0)
    }

    fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(&self.0)
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: JobState,
    failure: Option<JobFailure>,
    progress: Progress,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

/// The observable record of one job
pub struct JobStatus {
    id: JobId,
    job_type: String,
    request: Arc<Request>,
    lifecycle: Mutex<Lifecycle>,
    log: Arc<LogTail>,
    threshold: LogLevel,
    cancel_requested: AtomicBool,
    children: Mutex<Vec<Arc<dyn StatusView>>>,
    attachments: Mutex<Vec<(String, Box<dyn Attachment>)>>,
    bus: EventBus,
    capture: Arc<dyn LogCapture>,
    /// Whether this status owns the capture entry for its id
    captured: bool,
    clock: Arc<dyn Clock>,
}

impl JobStatus {
    /// Create a status in state `NONE` and attach its tail to the logging manager
    ///
    /// If another live status already holds the capture entry for `id`, it
    /// keeps it and this status only receives direct records.
    pub fn new(
        id: JobId,
        job_type: impl Into<String>,
        request: Arc<Request>,
        env: &JobEnv,
    ) -> Self {
        let log = Arc::new(LogTail::new(env.log_capacity));
        let threshold = if request.is_verbose() {
            LogLevel::Trace
        } else {
            LogLevel::Info
        };
        let target = CaptureTarget {
            tail: Arc::clone(&log),
            threshold,
            clock: Arc::clone(&env.clock),
        };
        let captured = env.capture.attach(&id, target);
        if !captured {
            tracing::warn!(job_id = %id, "log capture already attached for job id");
        }

        Self {
            id,
            job_type: job_type.into(),
            request,
            lifecycle: Mutex::new(Lifecycle {
                state: JobState::None,
                failure: None,
                progress: Progress::new(),
                started_at: None,
                ended_at: None,
            }),
            log,
            threshold,
            cancel_requested: AtomicBool::new(false),
            children: Mutex::new(Vec::new()),
            attachments: Mutex::new(Vec::new()),
            bus: env.bus.clone(),
            capture: Arc::clone(&env.capture),
            captured,
            clock: Arc::clone(&env.clock),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn state(&self) -> JobState {
        self.lifecycle().state
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn failure(&self) -> Option<JobFailure> {
        self.lifecycle().failure.clone()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().ended_at
    }

    pub fn progress(&self) -> f64 {
        self.lifecycle().progress.offset()
    }

    pub fn log_tail(&self) -> &Arc<LogTail> {
        &self.log
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a transition, returning the new state if it was legal
    pub(crate) fn transition(&self, transition: Transition) -> Option<JobState> {
        self.transition_with(transition, None)
    }

    /// Move to `FAILED`, recording the cause
    pub(crate) fn fail(&self, failure: JobFailure) -> Option<JobState> {
        self.transition_with(Transition::Fail, Some(failure))
    }

    fn transition_with(
        &self,
        transition: Transition,
        failure: Option<JobFailure>,
    ) -> Option<JobState> {
        let next = {
            let mut lifecycle = self.lifecycle();
            let current = lifecycle.state;
            let Some(next) = current.next(transition) else {
                tracing::warn!(
                    job_id = %self.id,
                    state = %current,
                    ?transition,
                    "ignoring illegal job transition"
                );
                return None;
            };

            let now = self.clock.now();
            lifecycle.state = next;
            match next {
                JobState::Running => lifecycle.started_at = Some(now),
                JobState::Finished => {
                    lifecycle.progress.finish();
                    lifecycle.ended_at = Some(now);
                }
                JobState::Canceled | JobState::Failed => {
                    lifecycle.failure = failure;
                    lifecycle.ended_at = Some(now);
                }
                JobState::None | JobState::Queued => {}
            }
            next
        };

        tracing::debug!(job_id = %self.id, state = %next, "job state changed");
        if next.is_terminal() && self.captured {
            self.capture.detach(&self.id);
        }
        Some(next)
    }

    /// Request cancellation. Returns false if the job is already terminal
    /// or cancellation was already requested.
    pub fn cancel(&self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if self.cancel_requested.swap(true, Ordering::AcqRel) {
            return false;
        }

        tracing::info!(job_id = %self.id, "cancellation requested");
        for child in self.children() {
            child.base().cancel();
        }
        self.publish(kinds::JOB_CANCEL_REQUESTED);
        true
    }

    /// Open a progress level of `steps` steps
    pub fn push_level(&self, steps: usize) {
        self.update_progress(|p| p.push_level(steps));
    }

    /// Complete one step of the current progress level
    pub fn step(&self) {
        self.update_progress(Progress::step);
    }

    /// Close the current progress level
    pub fn pop_level(&self) {
        self.update_progress(Progress::pop_level);
    }

    fn update_progress(&self, f: impl FnOnce(&mut Progress)) {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state.is_terminal() {
                return;
            }
            f(&mut lifecycle.progress);
        }
        self.publish(kinds::JOB_PROGRESS);
    }

    /// Append a record straight to the tail, honoring the request's verbosity
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if level.at_least(self.threshold) {
            self.log.append(LogRecord::new(level, message, self.clock.now()));
        }
    }

    /// Append an error record carrying a rendered cause
    pub fn log_error(&self, message: impl Into<String>, error: impl Into<String>) {
        self.log
            .append(LogRecord::new(LogLevel::Error, message, self.clock.now()).with_error(error));
    }

    /// Register the status of a sub-job
    pub fn add_child(&self, child: Arc<dyn StatusView>) {
        self.children
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(child);
    }

    pub fn children(&self) -> Vec<Arc<dyn StatusView>> {
        self.children
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Attach a named value to be considered when the status is snapshotted.
    /// A value attached under an existing name replaces it.
    pub fn attach<T>(&self, name: impl Into<String>, value: T)
    where
        T: Serialize + Any + Send + Sync,
    {
        let name = name.into();
        let mut attachments = self.attachments.lock().unwrap_or_else(|e| e.into_inner());
        attachments.retain(|(existing, _)| *existing != name);
        attachments.push((name, Box::new(Attached(value))));
    }

    pub fn attachment_names(&self) -> Vec<String> {
        self.attachments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Externalizable view of this status; attachments go through the gate
    pub fn snapshot(&self, gate: &SerializabilityGate) -> StatusSnapshot {
        let (state, progress, failure, started_at, ended_at) = {
            let lifecycle = self.lifecycle();
            (
                lifecycle.state,
                lifecycle.progress.offset(),
                lifecycle.failure.clone(),
                lifecycle.started_at,
                lifecycle.ended_at,
            )
        };

        let mut attachments = BTreeMap::new();
        let mut omitted = Vec::new();
        for (name, value) in self
            .attachments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
        {
            if !gate.is_serializable(&value.subject()) {
                omitted.push(name.clone());
                continue;
            }
            match value.to_json() {
                Ok(json) => {
                    attachments.insert(name.clone(), json);
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %self.id,
                        attachment = %name,
                        error = %e,
                        "attachment not serializable"
                    );
                    omitted.push(name.clone());
                }
            }
        }

        StatusSnapshot {
            id: self.id.clone(),
            job_type: self.job_type.clone(),
            state,
            progress,
            request: (*self.request).clone(),
            started_at,
            ended_at,
            failure,
            log: self.log.snapshot(),
            attachments,
            omitted,
            children: self
                .children()
                .iter()
                .map(|c| c.base().snapshot(gate))
                .collect(),
        }
    }

    /// Publish a lifecycle event about this job
    pub(crate) fn publish(&self, kind: &str) -> DispatchReport {
        self.bus.notify(kind, self.id.to_string(), self.event_data())
    }

    fn event_data(&self) -> Value {
        let lifecycle = self.lifecycle();
        let mut data = json!({
            "job_id": self.id,
            "job_type": self.job_type,
            "state": lifecycle.state,
            "progress": lifecycle.progress.offset(),
        });
        if let Some(failure) = &lifecycle.failure {
            data["error"] = json!(failure.to_string());
        }
        data
    }
}

impl std::fmt::Debug for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStatus")
            .field("id", &self.id)
            .field("job_type", &self.job_type)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Point-in-time, serializable copy of a status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub id: JobId,
    pub job_type: String,
    pub state: JobState,
    pub progress: f64,
    pub request: Request,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<JobFailure>,
    pub log: Vec<LogRecord>,
    /// Attachments the gate let through
    pub attachments: BTreeMap<String, Value>,
    /// Names of attachments left out
    pub omitted: Vec<String>,
    pub children: Vec<StatusSnapshot>,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
