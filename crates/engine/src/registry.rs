// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-type directory
//!
//! Maps a job-type id to a registered [`Job`]. The typed job is erased so
//! the executor can initialize and spawn any registered type uniformly.

use burrow_core::{ExecutionContext, Job, JobEnv, JobError, JobRunner, Request, StatusView};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An initialized job, ready to be spawned
pub(crate) struct Prepared {
    pub status: Arc<dyn StatusView>,
    /// The same status, typed as the job's own status type
    pub typed: Arc<dyn Any + Send + Sync>,
    pub run: BoxFuture<'static, ()>,
}

pub(crate) trait ErasedJob: Send + Sync {
    fn prepare(
        &self,
        env: JobEnv,
        request: Request,
        caller: Option<&ExecutionContext>,
    ) -> Result<Prepared, JobError>;
}

struct Registered<J>(Arc<J>);

impl<J: Job> ErasedJob for Registered<J> {
    fn prepare(
        &self,
        env: JobEnv,
        request: Request,
        caller: Option<&ExecutionContext>,
    ) -> Result<Prepared, JobError> {
        let mut runner = JobRunner::new(Arc::clone(&self.0), env);
        let status = runner.initialize(request, caller)?;
        let id = status.base().id().clone();

        let run = async move {
            if let Err(e) = runner.run().await {
                tracing::error!(job_id = %id, error = %e, "job runner failed");
            }
        }
        .boxed();

        Ok(Prepared {
            status: status.clone(),
            typed: status,
            run,
        })
    }
}

/// Directory of job types
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<dyn ErasedJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job under its type id. Returns true if it replaced an
    /// earlier registration.
    pub fn register<J: Job>(&self, job: J) -> bool {
        let job_type = job.job_type().to_string();
        let erased: Arc<dyn ErasedJob> = Arc::new(Registered(Arc::new(job)));
        let replaced = self
            .jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_type.clone(), erased)
            .is_some();
        tracing::debug!(%job_type, replaced, "registered job type");
        replaced
    }

    pub fn unregister(&self, job_type: &str) -> bool {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job_type)
            .is_some()
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(job_type)
    }

    /// Registered type ids, sorted
    pub fn job_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }

    pub(crate) fn get(&self, job_type: &str) -> Option<Arc<dyn ErasedJob>> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_type)
            .cloned()
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}
