use docflow::shared::InstanceId;
use docflow::store::{InstanceStore, MemoryInstanceStore, MemoryTemplateSource};
use docflow::workflow::{InstanceStatus, WorkflowEngine, WorkflowError, WorkflowTemplate};
use std::thread;

type Engine = WorkflowEngine<MemoryInstanceStore, MemoryTemplateSource>;

fn engine_with(templates: Vec<WorkflowTemplate>) -> Engine {
    WorkflowEngine::new(
        MemoryInstanceStore::new(),
        MemoryTemplateSource::with_templates(templates),
    )
}

fn article() -> WorkflowTemplate {
    WorkflowTemplate::new("article", ["Draft", "Review", "Publish"], ["Review"], [])
        .expect("valid template")
}

#[test]
fn start_resolves_template_and_persists_instance() {
    let engine = engine_with(vec![article()]);

    let started = engine.start("article", 100).expect("start");
    let id = started.id().expect("id assigned on save");
    assert_eq!(started.status(), InstanceStatus::Pending);
    assert_eq!(started.current_step(), "Draft");

    let loaded = engine.get(id).expect("load");
    assert_eq!(loaded, started);

    let second = engine.start("article", 101).expect("start second");
    assert!(second.id().expect("id") > id);
    assert_eq!(engine.list().expect("list").len(), 2);
}

#[test]
fn start_with_unknown_template_fails() {
    let engine = engine_with(Vec::new());
    let err = engine.start("missing", 0).expect_err("unknown template");
    assert!(matches!(err, WorkflowError::TemplateNotFound { ref template } if template == "missing"));
    assert!(engine.list().expect("list").is_empty());
}

#[test]
fn start_with_explicit_steps_validates_before_saving() {
    let engine = engine_with(Vec::new());

    let err = engine
        .start_with_steps(
            "adhoc",
            vec!["A".to_string(), "B".to_string()],
            vec!["Z".to_string()],
            Vec::new(),
            0,
        )
        .expect_err("undeclared gate");
    assert!(matches!(err, WorkflowError::InvalidTemplate { .. }));
    assert!(engine.store().find_all().expect("find all").is_empty());

    let started = engine
        .start_with_steps(
            "adhoc",
            vec!["A".to_string(), "Auto-B".to_string(), "C".to_string()],
            Vec::new(),
            vec!["Auto-B".to_string()],
            0,
        )
        .expect("start");
    let id = started.id().expect("id");
    let advanced = engine.advance(id, 1).expect("advance");
    assert_eq!(advanced.current_step(), "C");
}

#[test]
fn operations_on_unknown_instance_fail_with_not_found() {
    let engine = engine_with(vec![article()]);
    let missing = InstanceId::new(99);

    for result in [
        engine.get(missing),
        engine.advance(missing, 0),
        engine.approve_step(missing, 0),
        engine.auto_process(missing, 0),
        engine.cancel(missing, 0, None),
        engine.complete(missing, 0, None),
    ] {
        match result {
            Err(WorkflowError::InstanceNotFound { instance_id }) => assert_eq!(instance_id, "99"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

#[test]
fn approval_flow_is_persisted_between_calls() {
    let engine = engine_with(vec![article()]);
    let id = engine.start("article", 0).expect("start").id().expect("id");

    let gated = engine.advance(id, 1).expect("advance");
    assert_eq!(gated.status(), InstanceStatus::AwaitingApproval);
    assert_eq!(
        engine.get(id).expect("load").status(),
        InstanceStatus::AwaitingApproval
    );

    let approved = engine.approve_step(id, 2).expect("approve");
    assert_eq!(approved.current_step(), "Publish");
    assert_eq!(approved.status(), InstanceStatus::InProgress);

    let done = engine.auto_process(id, 3).expect("auto process");
    assert_eq!(done.status(), InstanceStatus::Completed);
    assert_eq!(done.completed_at(), Some(3));
    assert_eq!(engine.get(id).expect("load"), done);
}

#[test]
fn rejected_operation_leaves_stored_instance_untouched() {
    let engine = engine_with(vec![article()]);
    let id = engine.start("article", 0).expect("start").id().expect("id");
    let before = engine.get(id).expect("load");

    let err = engine.approve_step(id, 5).expect_err("draft is not gated");
    assert!(matches!(err, WorkflowError::StepNotApprovable { .. }));
    assert_eq!(engine.get(id).expect("load"), before);
}

#[test]
fn cancel_is_terminal_for_later_operations() {
    let engine = engine_with(vec![article()]);
    let id = engine.start("article", 0).expect("start").id().expect("id");

    let cancelled = engine
        .cancel(id, 1, Some("duplicate request"))
        .expect("cancel");
    assert_eq!(cancelled.status(), InstanceStatus::Cancelled);
    assert_eq!(cancelled.terminal_reason(), Some("duplicate request"));

    assert!(matches!(
        engine.advance(id, 2),
        Err(WorkflowError::InstanceTerminated { .. })
    ));
    assert!(matches!(
        engine.approve_step(id, 2),
        Err(WorkflowError::InstanceTerminated { .. })
    ));
    assert!(matches!(
        engine.complete(id, 2, None),
        Err(WorkflowError::InstanceTerminated { .. })
    ));

    let again = engine.cancel(id, 3, None).expect("repeat cancel");
    assert_eq!(again, cancelled);
}

#[test]
fn complete_overrides_remaining_steps() {
    let engine = engine_with(vec![article()]);
    let id = engine.start("article", 0).expect("start").id().expect("id");

    let completed = engine.complete(id, 7, None).expect("complete");
    assert_eq!(completed.status(), InstanceStatus::Completed);
    assert_eq!(completed.completed_at(), Some(7));
    assert_eq!(completed.current_step(), "Draft");

    let unchanged = engine.advance(id, 8).expect("advance completed");
    assert_eq!(unchanged, completed);
}

#[test]
fn redefining_template_only_affects_later_starts() {
    let memo = WorkflowTemplate::new("memo", ["Draft", "Send"], [], []).expect("template");
    let engine = engine_with(vec![memo]);
    let id = engine.start("memo", 0).expect("start").id().expect("id");

    let redefined =
        WorkflowTemplate::new("memo", ["Draft", "Legal", "Send"], ["Legal"], []).expect("template");
    engine.templates().define(redefined).expect("redefine");

    let advanced = engine.advance(id, 1).expect("advance");
    assert_eq!(advanced.current_step(), "Send");
    assert_eq!(advanced.status(), InstanceStatus::InProgress);
    assert_eq!(advanced.steps().len(), 2);
    assert_eq!(
        engine.advance(id, 2).expect("finish").status(),
        InstanceStatus::Completed
    );

    let later = engine.start("memo", 3).expect("start later").id().expect("id");
    let gated = engine.advance(later, 4).expect("advance later");
    assert_eq!(gated.current_step(), "Legal");
    assert_eq!(gated.status(), InstanceStatus::AwaitingApproval);
}

#[test]
fn concurrent_advances_on_one_instance_are_serialized() {
    let steps: Vec<String> = (1..=10).map(|n| format!("Step-{n}")).collect();
    let template =
        WorkflowTemplate::new("long", steps, Vec::<String>::new(), Vec::new()).expect("template");
    let engine = engine_with(vec![template]);
    let id = engine.start("long", 0).expect("start").id().expect("id");

    thread::scope(|scope| {
        for n in 0..9 {
            let engine = &engine;
            scope.spawn(move || {
                engine.advance(id, n).expect("advance");
            });
        }
    });

    let instance = engine.get(id).expect("load");
    assert_eq!(instance.current_index(), 9);
    assert_eq!(instance.current_step(), "Step-10");
    assert_eq!(instance.status(), InstanceStatus::InProgress);
}

#[test]
fn concurrent_approve_and_cancel_never_lose_the_cancel() {
    for round in 0..20 {
        let engine = engine_with(vec![article()]);
        let id = engine.start("article", 0).expect("start").id().expect("id");
        engine.advance(id, 1).expect("advance");

        let (approved, cancelled) = thread::scope(|scope| {
            let approve = scope.spawn(|| engine.approve_step(id, 2));
            let cancel = scope.spawn(|| engine.cancel(id, 2, None));
            (
                approve.join().expect("approve thread"),
                cancel.join().expect("cancel thread"),
            )
        });

        cancelled.expect("cancel always succeeds");
        let stored = engine.get(id).expect("load");
        assert_eq!(stored.status(), InstanceStatus::Cancelled, "round {round}");
        match approved {
            Ok(instance) => assert_eq!(instance.current_step(), "Publish"),
            Err(WorkflowError::InstanceTerminated { .. }) => {
                assert_eq!(stored.current_step(), "Review")
            }
            Err(other) => panic!("unexpected approve failure: {other:?}"),
        }
    }
}
