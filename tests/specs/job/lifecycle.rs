//! Job lifecycle specs
//!
//! State sequence, events, log capture and cancellation.

use crate::prelude::*;
use tracing_subscriber::prelude::*;

#[tokio::test]
async fn lifecycle_passes_through_every_state_in_order() {
    let env = env();
    let seen = record_kinds(
        &env.bus,
        "lifecycle",
        &[
            kinds::JOB_STARTING,
            kinds::JOB_RUNNING,
            kinds::JOB_FINISHED,
            kinds::JOB_CANCELED,
            kinds::JOB_FAILED,
        ],
    );

    let mut runner = JobRunner::new(Arc::new(Stepper(2)), env);
    let status = runner.initialize(Request::new(), None).unwrap();
    assert_eq!(status.state(), JobState::Queued);

    let status = runner.run().await.unwrap();
    assert_eq!(status.state(), JobState::Finished);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![kinds::JOB_STARTING, kinds::JOB_RUNNING, kinds::JOB_FINISHED]
    );
}

#[tokio::test]
async fn body_tracing_lands_in_the_job_tail() {
    let capture = CaptureRegistry::new();
    let subscriber = tracing_subscriber::registry().with(capture.layer());
    let _guard = tracing::subscriber::set_default(subscriber);

    let registry = JobRegistry::new();
    registry.register(Stepper(3));
    let executor = JobExecutor::from_config(Arc::new(registry), EngineConfig::default(), capture);

    let handle = executor.submit("stepper", Request::new(), None).unwrap();
    assert_eq!(handle.wait().await, JobState::Finished);

    let steps = handle
        .status()
        .log_tail()
        .snapshot()
        .into_iter()
        .filter(|r| r.message == "step")
        .count();
    assert_eq!(steps, 3);
}

#[tokio::test]
async fn cancel_event_stops_a_running_job() {
    struct Waiter;

    #[async_trait]
    impl Job for Waiter {
        type Status = JobStatus;

        fn job_type(&self) -> &str {
            "waiter"
        }

        fn create_new_status(&self, base: JobStatus) -> JobStatus {
            base
        }

        async fn run(&self, scope: &JobScope<JobStatus>) -> Result<(), JobError> {
            loop {
                scope.checkpoint()?;
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
        }
    }

    let registry = JobRegistry::new();
    registry.register(Waiter);
    let executor = JobExecutor::from_config(
        Arc::new(registry),
        EngineConfig::default(),
        CaptureRegistry::new(),
    );
    executor.listen_for_cancel_requests();

    let handle = executor.submit("waiter", Request::new(), None).unwrap();
    executor
        .bus()
        .notify(kinds::JOB_CANCEL, "operator", json!({ "job_id": handle.id() }));

    assert_eq!(handle.wait().await, JobState::Canceled);
    assert!(handle.status().failure().is_none());
    assert!(!handle.cancel());
}
