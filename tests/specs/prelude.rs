//! Shared job types and helpers for the specs

#![allow(dead_code)]

pub use async_trait::async_trait;
pub use burrow_core::{
    kinds, ContextError, Event, EventBus, EventPattern, ExecutionContext, FnListener, Job,
    JobEnv, JobError, JobId, JobRunner, JobScope, JobState, JobStatus, Listener, ListenerError,
    LogLevel, LogRecord, LogTail, Request, SequentialIdGen, SerializabilityGate, Subject,
    Subscription,
};
pub use burrow_engine::{CaptureRegistry, EngineConfig, JobExecutor, JobRegistry};
pub use serde_json::json;
pub use std::sync::{Arc, Mutex};

/// Deterministic environment on a fresh bus
pub fn env() -> JobEnv {
    JobEnv::new(EventBus::new()).with_id_gen(Arc::new(SequentialIdGen::new("job")))
}

/// Record every event kind seen on `bus` under the listener name `name`
pub fn record_kinds(bus: &EventBus, name: &str, patterns: &[&str]) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let patterns = patterns.iter().map(|p| EventPattern::new(p)).collect();
    bus.register(Arc::new(FnListener::new(
        Subscription::new(name, patterns, "records kinds"),
        move |event: &Event| {
            sink.lock().unwrap().push(event.kind.clone());
            Ok(())
        },
    )));
    seen
}

/// A job whose body always fails with the given message
pub struct Throwing(pub &'static str);

#[async_trait]
impl Job for Throwing {
    type Status = JobStatus;

    fn job_type(&self) -> &str {
        "throwing"
    }

    fn create_new_status(&self, base: JobStatus) -> JobStatus {
        base
    }

    async fn run(&self, _scope: &JobScope<JobStatus>) -> Result<(), JobError> {
        Err(JobError::failed(self.0))
    }
}

/// A job reporting progress over `steps` steps
pub struct Stepper(pub usize);

#[async_trait]
impl Job for Stepper {
    type Status = JobStatus;

    fn job_type(&self) -> &str {
        "stepper"
    }

    fn create_new_status(&self, base: JobStatus) -> JobStatus {
        base
    }

    async fn run(&self, scope: &JobScope<JobStatus>) -> Result<(), JobError> {
        scope.base().push_level(self.0);
        for _ in 0..self.0 {
            scope.checkpoint()?;
            tracing::info!("step");
            scope.base().step();
        }
        scope.base().pop_level();
        Ok(())
    }
}
