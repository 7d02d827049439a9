//! Job failure specs
//!
//! Body failures become terminal status data and never reach the caller.

use crate::prelude::*;
use burrow_core::FailureKind;

#[tokio::test]
async fn throwing_body_ends_failed_with_error_record() {
    let mut runner = JobRunner::new(Arc::new(Throwing("boom")), env());
    runner.initialize(Request::new(), None).unwrap();
    let status = runner.run().await.unwrap();

    assert_eq!(status.state(), JobState::Failed);
    let failure = status.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Error);
    assert_eq!(failure.message, "boom");

    let errors = status.log_tail().filter(LogLevel::Error);
    assert!(errors
        .iter()
        .any(|r| r.level == LogLevel::Error && r.error.as_deref() == Some("boom")));
}

#[tokio::test]
async fn failure_never_becomes_finished() {
    let env = env();
    let seen = record_kinds(&env.bus, "terminal", &[kinds::JOB_FINISHED, kinds::JOB_FAILED]);

    let mut runner = JobRunner::new(Arc::new(Throwing("boom")), env);
    runner.initialize(Request::new(), None).unwrap();
    runner.run().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![kinds::JOB_FAILED]);
}

#[tokio::test]
async fn executor_reports_failure_through_status_only() {
    let registry = JobRegistry::new();
    registry.register(Throwing("database offline"));
    let executor = JobExecutor::from_config(
        Arc::new(registry),
        EngineConfig::default(),
        CaptureRegistry::new(),
    );

    let handle = executor
        .submit("throwing", Request::new(), None)
        .unwrap();
    assert_eq!(handle.wait().await, JobState::Failed);

    let snapshot = executor.snapshot(handle.id()).unwrap();
    assert_eq!(snapshot.failure.unwrap().message, "database offline");
    assert!(snapshot.log.iter().any(|r| r.level == LogLevel::Error));
}
