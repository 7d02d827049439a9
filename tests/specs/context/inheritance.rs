//! Execution context specs
//!
//! Declaration uniqueness, inheritance and finality.

use crate::prelude::*;

#[test]
fn duplicate_declaration_fails_and_changes_nothing() {
    let mut ctx = ExecutionContext::new();
    ctx.declare_property("locale", "en", true, false, false)
        .unwrap();

    let err = ctx
        .declare_property("locale", "fr", false, true, true)
        .unwrap_err();

    assert!(matches!(err, ContextError::DuplicateProperty(ref name) if name == "locale"));
    assert_eq!(ctx.names().collect::<Vec<_>>(), vec!["locale"]);
    assert_eq!(ctx.get_property("locale"), Some(json!("en")));
    assert!(ctx.property("locale").unwrap().is_inherited());
}

#[test]
fn inherited_final_on_both_sides_is_illegal() {
    let mut parent = ExecutionContext::new();
    parent
        .declare_property("inherited", "test", true, true, false)
        .unwrap();
    let mut child = ExecutionContext::new();
    child
        .declare_property("inherited", "test", true, true, false)
        .unwrap();

    let err = child.inherit_from(&parent).unwrap_err();

    assert!(matches!(err, ContextError::IllegalInheritance(_)));
    assert!(err.to_string().contains("inherited"));
    assert_eq!(child.len(), 1);
    assert_eq!(parent.len(), 1);
}

#[test]
fn inheritance_shares_or_clones_per_property() {
    let mut parent = ExecutionContext::new();
    parent
        .declare_property("user", json!({"name": "ada"}), true, false, false)
        .unwrap();
    parent
        .declare_property("settings", json!({"depth": 1}), true, false, true)
        .unwrap();
    parent
        .declare_property("scratch", 0, false, false, false)
        .unwrap();

    let mut child = ExecutionContext::new();
    child.inherit_from(&parent).unwrap();

    assert!(!child.has_property("scratch"));

    child.set_property("user", json!({"name": "grace"})).unwrap();
    assert_eq!(parent.get_property("user"), Some(json!({"name": "grace"})));

    child.set_property("settings", json!({"depth": 9})).unwrap();
    assert_eq!(parent.get_property("settings"), Some(json!({"depth": 1})));
}

#[test]
fn final_property_is_immutable_in_every_context() {
    let mut parent = ExecutionContext::new();
    parent
        .declare_property("tx", "tx-1", true, true, false)
        .unwrap();
    let mut child = ExecutionContext::new();
    child.inherit_from(&parent).unwrap();

    assert!(matches!(
        parent.set_property("tx", "tx-2"),
        Err(ContextError::ImmutableProperty(_))
    ));
    assert!(matches!(
        child.set_property("tx", "tx-2"),
        Err(ContextError::ImmutableProperty(_))
    ));
}

#[tokio::test]
async fn submitted_job_inherits_the_callers_context() {
    struct Echo;

    #[async_trait]
    impl Job for Echo {
        type Status = JobStatus;

        fn job_type(&self) -> &str {
            "echo"
        }

        fn create_new_status(&self, base: JobStatus) -> JobStatus {
            base
        }

        async fn run(&self, scope: &JobScope<JobStatus>) -> Result<(), JobError> {
            let locale = scope.property("locale").unwrap_or_default();
            scope.base().attach("locale", locale);
            Ok(())
        }
    }

    let registry = JobRegistry::new();
    registry.register(Echo);
    let executor = JobExecutor::from_config(
        Arc::new(registry),
        EngineConfig::default(),
        CaptureRegistry::new(),
    );

    let mut caller = ExecutionContext::new();
    caller.declare("locale").initial("pt").inherited().commit().unwrap();

    let handle = executor.submit("echo", Request::new(), Some(&caller)).unwrap();
    assert_eq!(handle.wait().await, JobState::Finished);

    let snapshot = executor.snapshot(handle.id()).unwrap();
    assert_eq!(snapshot.attachments["locale"], json!("pt"));
}
