//! Serializability gate specs
//!
//! First definite verdict wins; the default policy decides the rest.

use crate::prelude::*;
use burrow_core::{FnCheck, TypeNamePrefix, TypeRule, Verdict};
use serde::Serialize;

#[derive(Serialize)]
struct Summary {
    rows: u64,
}

#[derive(Serialize)]
struct Cache {
    entries: Vec<u64>,
}

#[test]
fn first_definite_verdict_wins() {
    let mut gate = SerializabilityGate::new(true);
    gate.register(10, TypeRule::new("allow-cache").allow::<Cache>());
    gate.register(0, TypeRule::new("deny-cache").deny::<Cache>());
    gate.register(5, FnCheck::new("undecided", |_: &Subject<'_>| Verdict::Unknown));

    assert_eq!(gate.checks(), vec!["deny-cache", "undecided", "allow-cache"]);
    assert_eq!(gate.verdict(&Subject::of::<Cache>()), Verdict::Omit);
    assert!(!gate.is_serializable(&Subject::of::<Cache>()));
}

#[test]
fn default_policy_applies_when_nobody_decides() {
    let permissive = SerializabilityGate::new(true);
    let strict = SerializabilityGate::new(false);

    assert_eq!(permissive.verdict(&Subject::of::<Summary>()), Verdict::Unknown);
    assert!(permissive.is_serializable(&Subject::of::<Summary>()));
    assert!(!strict.is_serializable(&Subject::of::<Summary>()));
}

#[test]
fn prefix_rules_cover_whole_modules() {
    let mut gate = SerializabilityGate::new(true);
    gate.register(0, TypeNamePrefix::deny("alloc::"));

    assert!(!gate.is_serializable(&Subject::of::<Vec<u8>>()));
    assert!(gate.is_serializable(&Subject::of::<u8>()));
}

#[test]
fn value_checks_see_the_object() {
    let mut gate = SerializabilityGate::new(true);
    gate.register(
        0,
        FnCheck::new("small-caches", |subject: &Subject<'_>| {
            match subject.downcast_ref::<Cache>() {
                Some(cache) => Verdict::from_bool(cache.entries.len() <= 2),
                None => Verdict::Unknown,
            }
        }),
    );

    let small = Cache { entries: vec![1] };
    let large = Cache {
        entries: vec![1, 2, 3],
    };
    assert!(gate.is_serializable(&Subject::object(&small)));
    assert!(!gate.is_serializable(&Subject::object(&large)));
}

#[test]
fn status_snapshot_keeps_only_allowed_attachments() {
    let env = env();
    let status = JobStatus::new(
        JobId::from("job-1"),
        "report",
        Arc::new(Request::new()),
        &env,
    );
    status.attach("summary", Summary { rows: 3 });
    status.attach("cache", Cache { entries: vec![] });

    let mut gate = SerializabilityGate::new(true);
    gate.register(0, TypeRule::new("no-caches").deny::<Cache>());

    let snapshot = status.snapshot(&gate);
    assert_eq!(snapshot.attachments.len(), 1);
    assert_eq!(snapshot.attachments["summary"], json!({"rows": 3}));
    assert_eq!(snapshot.omitted, vec!["cache".to_string()]);
}
