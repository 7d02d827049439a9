//! Event bus specs
//!
//! Interest filtering, ordering and listener isolation.

use crate::prelude::*;

#[test]
fn kind_listener_only_sees_its_kind() {
    let bus = EventBus::new();
    let finished = record_kinds(&bus, "finished-only", &[kinds::JOB_FINISHED]);

    bus.notify(kinds::JOB_STARTING, "job-1", json!({}));
    bus.notify(kinds::JOB_FINISHED, "job-1", json!({}));
    bus.notify(kinds::JOB_FAILED, "job-2", json!({}));

    assert_eq!(*finished.lock().unwrap(), vec![kinds::JOB_FINISHED]);
}

#[test]
fn wildcard_listener_sees_everything_in_publication_order() {
    let bus = EventBus::new();
    let all = record_kinds(&bus, "all", &["**"]);

    for kind in ["a", "b:c", "d:e:f", "a"] {
        bus.notify(kind, "test", json!(null));
    }

    assert_eq!(*all.lock().unwrap(), vec!["a", "b:c", "d:e:f", "a"]);
}

#[test]
fn listeners_run_in_registration_order() {
    let bus = EventBus::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        bus.register(Arc::new(FnListener::new(
            Subscription::all(name, "ordering"),
            move |_: &Event| {
                order.lock().unwrap().push(name);
                Ok(())
            },
        )));
    }

    bus.notify("tick", "test", json!(null));
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn failing_and_panicking_listeners_are_isolated() {
    let bus = EventBus::new();
    bus.register(Arc::new(FnListener::new(
        Subscription::all("fails", "always errors"),
        |_: &Event| Err(ListenerError::failed("nope")),
    )));
    bus.register(Arc::new(FnListener::new(
        Subscription::all("panics", "always panics"),
        |_: &Event| -> Result<(), ListenerError> { panic!("listener bug") },
    )));
    let seen = record_kinds(&bus, "healthy", &["**"]);

    let report = bus.notify("tick", "test", json!(null));

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].listener, "fails");
    assert_eq!(report.failures[1].listener, "panics");
    assert!(report.failures[1].reason.contains("listener bug"));
    assert_eq!(*seen.lock().unwrap(), vec!["tick"]);
}

#[test]
fn reregistering_replaces_and_unregister_is_idempotent() {
    let bus = EventBus::new();
    let old = record_kinds(&bus, "watch", &["**"]);
    let _other = record_kinds(&bus, "other", &["**"]);
    let new = record_kinds(&bus, "watch", &["**"]);

    bus.notify("tick", "test", json!(null));
    assert!(old.lock().unwrap().is_empty());
    assert_eq!(*new.lock().unwrap(), vec!["tick"]);
    assert_eq!(bus.subscriber_count(), 2);

    assert!(bus.unregister("watch"));
    assert!(!bus.unregister("watch"));
    assert_eq!(bus.subscriber_count(), 1);
}

#[tokio::test]
async fn progress_is_never_seen_after_terminal_event() {
    let env = env();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    env.bus.register(Arc::new(FnListener::new(
        Subscription::new(
            "progress",
            vec![EventPattern::new("job:*")],
            "progress watcher",
        ),
        move |event: &Event| {
            let progress = event.data["progress"].as_f64().unwrap_or_default();
            sink.lock().unwrap().push((event.kind.clone(), progress));
            Ok(())
        },
    )));

    let mut runner = JobRunner::new(Arc::new(Stepper(4)), env);
    runner.initialize(Request::new(), None).unwrap();
    runner.run().await.unwrap();

    let seen = seen.lock().unwrap();
    let (last_kind, last_progress) = seen.last().unwrap();
    assert_eq!(last_kind, kinds::JOB_FINISHED);
    assert_eq!(*last_progress, 1.0);

    let progress: Vec<f64> = seen
        .iter()
        .filter(|(kind, _)| kind == kinds::JOB_PROGRESS)
        .map(|(_, p)| *p)
        .collect();
    assert!(progress.contains(&0.5));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn audit_log_records_a_job_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let env = env();
    let audit = burrow_core::AuditLog::open_filtered(
        dir.path().join("audit.jsonl"),
        vec![EventPattern::new("job:*")],
    )
    .unwrap();
    let audit = Arc::new(audit);
    env.bus.register(audit.clone());

    let mut runner = JobRunner::new(Arc::new(Throwing("boom")), env);
    runner.initialize(Request::new(), None).unwrap();
    runner.run().await.unwrap();

    let records = audit.read_all().unwrap();
    let seen: Vec<&str> = records.iter().map(|r| r.kind.as_str()).collect();
    assert_eq!(seen, vec![kinds::JOB_STARTING, kinds::JOB_RUNNING, kinds::JOB_FAILED]);
    assert_eq!(audit.current_sequence(), 3);
    assert_eq!(records[2].event.data["error"], json!("boom"));
}
