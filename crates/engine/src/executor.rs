// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor: initializes jobs on the caller and runs each on its own task

use crate::capture::CaptureRegistry;
use crate::config::EngineConfig;
use crate::listeners::CancelOnRequest;
use crate::registry::JobRegistry;
use burrow_core::{
    EventBus, ExecutionContext, JobEnv, JobError, JobId, JobState, JobStatus, Request,
    SerializabilityGate, StatusSnapshot, StatusView,
};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument::WithSubscriber;

/// Errors returned by the executor to its callers
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    #[error("job already exists: {0}")]
    DuplicateJob(JobId),

    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("executor is shutting down")]
    ShuttingDown,

    #[error("no tokio runtime available to run jobs")]
    NoRuntime,

    #[error(transparent)]
    Job(#[from] JobError),
}

/// Caller-side view of a submitted job
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    status: Arc<dyn StatusView>,
    typed: Arc<dyn Any + Send + Sync>,
    done: watch::Receiver<bool>,
}

impl JobHandle {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Live common status
    pub fn status(&self) -> &JobStatus {
        self.status.base()
    }

    pub fn status_view(&self) -> Arc<dyn StatusView> {
        Arc::clone(&self.status)
    }

    /// The job's own status type, if it is `S`
    pub fn status_as<S: StatusView>(&self) -> Option<Arc<S>> {
        Arc::clone(&self.typed).downcast::<S>().ok()
    }

    pub fn cancel(&self) -> bool {
        self.status().cancel()
    }

    /// True once the job's task has finished
    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Wait for the job's task to finish and return the final state
    pub async fn wait(&self) -> JobState {
        let mut done = self.done.clone();
        if done.wait_for(|finished| *finished).await.is_err() {
            tracing::warn!(job_id = %self.id, "job task ended without reporting completion");
        }
        self.status().state()
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("state", &self.status().state())
            .finish()
    }
}

#[derive(Default)]
struct Entries {
    handles: BTreeMap<JobId, JobHandle>,
    /// Ids claimed by a submission still being initialized
    reserved: BTreeSet<JobId>,
}

/// Jobs known to an executor, shared with listeners that act on them
#[derive(Clone, Default)]
pub struct JobTable {
    entries: Arc<Mutex<Entries>>,
}

impl JobTable {
    fn entries(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, id: &JobId) -> Option<JobHandle> {
        self.entries().handles.get(id).cloned()
    }

    /// True if `id` belongs to a tracked job or one being submitted
    pub fn contains(&self, id: &JobId) -> bool {
        let entries = self.entries();
        entries.handles.contains_key(id) || entries.reserved.contains(id)
    }

    pub fn handles(&self) -> Vec<JobHandle> {
        self.entries().handles.values().cloned().collect()
    }

    /// Claim `id` for a submission; false if it is tracked or already claimed
    fn reserve(&self, id: &JobId) -> bool {
        let mut entries = self.entries();
        if entries.handles.contains_key(id) || entries.reserved.contains(id) {
            return false;
        }
        entries.reserved.insert(id.clone());
        true
    }

    fn release(&self, id: &JobId) {
        self.entries().reserved.remove(id);
    }

    /// Turn the reservation for the handle's id into a tracked job
    fn fill(&self, handle: JobHandle) {
        let mut entries = self.entries();
        entries.reserved.remove(&handle.id);
        entries.handles.insert(handle.id.clone(), handle);
    }

    fn retain(&self, f: impl FnMut(&JobId, &mut JobHandle) -> bool) {
        self.entries().handles.retain(f);
    }
}

/// Outcome of [`JobExecutor::shutdown`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Jobs that were still active and got cancelled
    pub canceled: Vec<JobId>,
    /// Jobs still running when the grace period ran out
    pub timed_out: Vec<JobId>,
}

/// Runs registered job types
pub struct JobExecutor {
    registry: Arc<JobRegistry>,
    env: JobEnv,
    gate: Arc<SerializabilityGate>,
    config: EngineConfig,
    jobs: JobTable,
    accepting: AtomicBool,
}

impl JobExecutor {
    /// The environment's log capacity is taken from `config`
    pub fn new(
        registry: Arc<JobRegistry>,
        env: JobEnv,
        gate: SerializabilityGate,
        config: EngineConfig,
    ) -> Self {
        let env = env.with_log_capacity(config.tail_capacity());
        Self {
            registry,
            env,
            gate: Arc::new(gate),
            config,
            jobs: JobTable::default(),
            accepting: AtomicBool::new(true),
        }
    }

    /// Executor with a fresh bus, the given log capture and a gate built from `config`
    pub fn from_config(
        registry: Arc<JobRegistry>,
        config: EngineConfig,
        capture: CaptureRegistry,
    ) -> Self {
        let env = JobEnv::new(EventBus::new()).with_capture(Arc::new(capture));
        let gate = config.gate();
        Self::new(registry, env, gate, config)
    }

    /// Register a [`CancelOnRequest`] listener for this executor's jobs
    pub fn listen_for_cancel_requests(&self) {
        self.env
            .bus
            .register(Arc::new(CancelOnRequest::new(self.jobs.clone())));
    }

    pub fn bus(&self) -> &EventBus {
        &self.env.bus
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &SerializabilityGate {
        &self.gate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Initialize a job on the calling thread, then run it on its own task.
    ///
    /// The job id is resolved and claimed before anything is built, so a
    /// rejected submission leaves no status, event or log capture behind.
    /// The job's context is fully built before the task starts. Failures of
    /// the job body are never returned here; watch the status instead.
    pub fn submit(
        &self,
        job_type: &str,
        request: Request,
        caller: Option<&ExecutionContext>,
    ) -> Result<JobHandle, ExecutorError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(ExecutorError::ShuttingDown);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ExecutorError::NoRuntime)?;
        let job = self
            .registry
            .get(job_type)
            .ok_or_else(|| ExecutorError::UnknownJobType(job_type.to_string()))?;

        let id = match request.id() {
            Some(id) => id.clone(),
            None => self.env.id_gen.next(),
        };
        if !self.jobs.reserve(&id) {
            return Err(ExecutorError::DuplicateJob(id));
        }

        let caller = caller.filter(|_| self.config.inherit_caller_context);
        let request = request.with_id(id.clone());
        let prepared = match job.prepare(self.env.clone(), request, caller) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.jobs.release(&id);
                return Err(match e {
                    JobError::DuplicateId(id) => ExecutorError::DuplicateJob(id),
                    e => ExecutorError::Job(e),
                });
            }
        };

        let (done_tx, done_rx) = watch::channel(false);
        let handle = JobHandle {
            id: id.clone(),
            status: prepared.status,
            typed: prepared.typed,
            done: done_rx,
        };
        self.jobs.fill(handle.clone());

        let run = prepared.run;
        runtime.spawn(
            async move {
                run.await;
                let _ = done_tx.send(true);
            }
            .with_current_subscriber(),
        );

        tracing::info!(job_id = %id, %job_type, "job submitted");
        Ok(handle)
    }

    pub fn get(&self, id: &JobId) -> Option<JobHandle> {
        self.jobs.get(id)
    }

    pub fn get_status(&self, id: &JobId) -> Option<Arc<dyn StatusView>> {
        self.jobs.get(id).map(|h| h.status_view())
    }

    /// Snapshot of a job's status, attachments filtered through the gate
    pub fn snapshot(&self, id: &JobId) -> Option<StatusSnapshot> {
        self.jobs.get(id).map(|h| h.status().snapshot(&self.gate))
    }

    /// Ids of jobs not yet in a terminal state
    pub fn active_jobs(&self) -> Vec<JobId> {
        self.jobs
            .handles()
            .into_iter()
            .filter(|h| !h.status().is_terminal())
            .map(|h| h.id)
            .collect()
    }

    /// Request cancellation of a job
    pub fn cancel(&self, id: &JobId) -> Result<bool, ExecutorError> {
        let handle = self
            .jobs
            .get(id)
            .ok_or_else(|| ExecutorError::NotFound(id.clone()))?;
        Ok(handle.cancel())
    }

    /// Forget terminal jobs, returning how many were dropped
    pub fn prune(&self) -> usize {
        let mut pruned = 0;
        self.jobs.retain(|_, handle| {
            let keep = !(handle.is_done() && handle.status().is_terminal());
            if !keep {
                pruned += 1;
            }
            keep
        });
        pruned
    }

    /// Stop accepting jobs, cancel every active one and wait up to the
    /// configured grace period for them to wind down.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.accepting.store(false, Ordering::Release);

        let active: Vec<JobHandle> = self
            .jobs
            .handles()
            .into_iter()
            .filter(|h| !h.is_done())
            .collect();
        let mut report = ShutdownReport::default();
        for handle in &active {
            if handle.cancel() {
                report.canceled.push(handle.id.clone());
            }
        }
        tracing::info!(active = active.len(), "shutting down executor");

        let all_done = futures::future::join_all(active.iter().map(|h| h.wait()));
        if tokio::time::timeout(self.config.shutdown_grace, all_done)
            .await
            .is_err()
        {
            report.timed_out = active
                .iter()
                .filter(|h| !h.is_done())
                .map(|h| h.id.clone())
                .collect();
            tracing::warn!(
                count = report.timed_out.len(),
                "jobs still running after shutdown grace"
            );
        }
        report
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
