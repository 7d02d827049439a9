// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs: typed units of asynchronous work and the runner driving their lifecycle
//!
//! A [`JobRunner`] is initialized on the calling thread, which builds the
//! job's execution context and status, and then run, usually on a worker
//! task. Failures escaping the body never reach the caller: they end up in
//! the terminal status.

use crate::context::{ContextError, Execution, ExecutionContext};
use crate::env::JobEnv;
use crate::events::{kinds, EventBus};
use crate::id::JobId;
use crate::logtail::LogLevel;
use crate::panic::panic_message;
use crate::request::Request;
use crate::status::{JobFailure, JobStatus, StatusView, Transition};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

/// Context property every job context declares, final and local
pub const JOB_ID_PROPERTY: &str = "job.id";

/// Errors from driving a job or raised by a job body
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job canceled")]
    Canceled,

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("job already initialized")]
    AlreadyInitialized,

    #[error("job not initialized")]
    NotInitialized,

    #[error("job id already in use: {0}")]
    DuplicateId(JobId),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        JobError::Failed(message.into())
    }

    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        JobError::Other(Box::new(error))
    }
}

/// A job type: its status shape and its body
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Status type this job exposes; wraps the common [`JobStatus`]
    type Status: StatusView;

    /// Job-type identifier
    fn job_type(&self) -> &str;

    /// Build this job type's status around the common one
    fn create_new_status(&self, base: JobStatus) -> Self::Status;

    /// Declare job-specific properties before the caller's context is inherited
    fn declare_context(
        &self,
        _context: &mut ExecutionContext,
        _request: &Request,
    ) -> Result<(), ContextError> {
        Ok(())
    }

    /// The job body
    async fn run(&self, scope: &JobScope<Self::Status>) -> Result<(), JobError>;
}

struct Prepared<S> {
    status: Arc<S>,
    context: ExecutionContext,
}

enum Outcome {
    Finished,
    Canceled,
    Failed(JobFailure),
}

/// Drives one job instance through its lifecycle
pub struct JobRunner<J: Job> {
    job: Arc<J>,
    env: JobEnv,
    prepared: Option<Prepared<J::Status>>,
}

impl<J: Job> JobRunner<J> {
    pub fn new(job: Arc<J>, env: JobEnv) -> Self {
        Self {
            job,
            env,
            prepared: None,
        }
    }

    /// Build the job's context and status and move it to `QUEUED`.
    ///
    /// Context errors, and an id whose log capture is held by a live job,
    /// surface here before any status exists.
    pub fn initialize(
        &mut self,
        request: Request,
        caller: Option<&ExecutionContext>,
    ) -> Result<Arc<J::Status>, JobError> {
        if self.prepared.is_some() {
            return Err(JobError::AlreadyInitialized);
        }

        let request = Arc::new(request);
        let id = request
            .id()
            .cloned()
            .unwrap_or_else(|| self.env.id_gen.next());
        if self.env.capture.is_attached(&id) {
            return Err(JobError::DuplicateId(id));
        }

        let mut context = ExecutionContext::new();
        context
            .declare(JOB_ID_PROPERTY)
            .initial(id.as_str())
            .make_final()
            .commit()?;
        self.job.declare_context(&mut context, &request)?;
        if let Some(caller) = caller {
            context.inherit_from(caller)?;
        }

        let base = JobStatus::new(id, self.job.job_type(), request, &self.env);
        let status = Arc::new(self.job.create_new_status(base));
        let base = status.base();
        base.transition(Transition::Enqueue);
        base.publish(kinds::JOB_STARTING);
        tracing::info!(job_id = %base.id(), job_type = base.job_type(), "job initialized");

        self.prepared = Some(Prepared {
            status: Arc::clone(&status),
            context,
        });
        Ok(status)
    }

    /// Live status, once initialized
    pub fn status(&self) -> Option<&Arc<J::Status>> {
        self.prepared.as_ref().map(|p| &p.status)
    }

    /// Run the body to a terminal state.
    ///
    /// Only fails when the runner was never initialized; body failures are
    /// recorded on the returned status.
    pub async fn run(self) -> Result<Arc<J::Status>, JobError> {
        let Prepared { status, context } = self.prepared.ok_or(JobError::NotInitialized)?;
        let base = status.base();

        base.transition(Transition::Start);
        base.publish(kinds::JOB_RUNNING);

        let scope = JobScope {
            status: Arc::clone(&status),
            execution: Execution::with_root(context),
            env: self.env,
        };

        let outcome = if base.is_cancel_requested() {
            tracing::info!(job_id = %base.id(), "job canceled before start");
            Outcome::Canceled
        } else {
            let span = tracing::info_span!("job", job_id = %base.id(), job_type = base.job_type());
            let body = AssertUnwindSafe(self.job.run(&scope).instrument(span)).catch_unwind();
            match body.await {
                Ok(Ok(())) => Outcome::Finished,
                Ok(Err(JobError::Canceled)) => Outcome::Canceled,
                Ok(Err(e)) => Outcome::Failed(JobFailure::error(e.to_string())),
                Err(payload) => Outcome::Failed(JobFailure::panic(panic_message(&*payload))),
            }
        };

        match outcome {
            Outcome::Finished => {
                base.transition(Transition::Complete);
                base.publish(kinds::JOB_FINISHED);
                tracing::info!(job_id = %base.id(), "job finished");
            }
            Outcome::Canceled => {
                base.transition(Transition::Cancel);
                base.publish(kinds::JOB_CANCELED);
                tracing::info!(job_id = %base.id(), "job canceled");
            }
            Outcome::Failed(failure) => {
                base.log_error("job failed", failure.to_string());
                tracing::error!(job_id = %base.id(), error = %failure, "job failed");
                base.fail(failure);
                base.publish(kinds::JOB_FAILED);
            }
        }

        scope.execution.clear();
        Ok(status)
    }
}

/// What a running job body sees
pub struct JobScope<S> {
    status: Arc<S>,
    execution: Execution,
    env: JobEnv,
}

impl<S: StatusView> JobScope<S> {
    /// The job-type-specific status
    pub fn status(&self) -> &Arc<S> {
        &self.status
    }

    pub fn base(&self) -> &JobStatus {
        self.status.base()
    }

    pub fn id(&self) -> &JobId {
        self.base().id()
    }

    pub fn request(&self) -> &Request {
        self.base().request()
    }

    /// Scope stack rooted at this job's context
    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    /// Read a property from the active scope
    pub fn property(&self, name: &str) -> Option<Value> {
        self.execution.get_property(name)
    }

    /// Set a property in the active scope
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> Result<(), JobError> {
        self.execution
            .with_current(|ctx| ctx.set_property(name, value))
            .ok_or(JobError::NotInitialized)??;
        Ok(())
    }

    pub fn is_canceled(&self) -> bool {
        self.base().is_cancel_requested()
    }

    /// Cancellation point: `Err(Canceled)` once cancellation was requested
    pub fn checkpoint(&self) -> Result<(), JobError> {
        if self.is_canceled() {
            return Err(JobError::Canceled);
        }
        Ok(())
    }

    pub fn bus(&self) -> &EventBus {
        &self.env.bus
    }

    /// Log straight into this job's tail
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.base().log(level, message);
    }

    /// Run a sub-job inline, inheriting from the active scope.
    ///
    /// The child's status is registered as a sub-status before it starts, so
    /// cancelling this job also cancels the child.
    pub async fn run_child<C: Job>(
        &self,
        job: Arc<C>,
        request: Request,
    ) -> Result<Arc<C::Status>, JobError> {
        self.checkpoint()?;

        let mut runner = JobRunner::new(job, self.env.clone());
        let status = self
            .execution
            .with_current(|ctx| runner.initialize(request, Some(ctx)))
            .ok_or(JobError::NotInitialized)??;
        self.base().add_child(status.clone());

        tracing::debug!(job_id = %self.id(), child = %status.base().id(), "running sub-job");
        runner.run().await
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
