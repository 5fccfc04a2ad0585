use docflow::shared::InstanceId;
use docflow::store::{InstanceStore, MemoryTemplateSource, SqliteInstanceStore};
use docflow::workflow::{
    InstanceStatus, WorkflowEngine, WorkflowError, WorkflowInstance, WorkflowTemplate,
};
use rusqlite::Connection;
use std::path::Path;
use std::thread;
use tempfile::tempdir;

fn intake() -> WorkflowTemplate {
    WorkflowTemplate::new(
        "intake",
        ["Submit", "Auto-Scan", "Approval", "File"],
        ["Approval"],
        ["Auto-Scan"],
    )
    .expect("valid template")
}

#[test]
fn open_creates_schema_and_parent_directory() {
    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("nested/instances.db");
    let store = SqliteInstanceStore::open(&db_path).expect("open");
    assert_eq!(store.db_path(), db_path.as_path());

    let connection = Connection::open(&db_path).expect("open raw");
    let count: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'workflow_instances'",
            [],
            |row| row.get(0),
        )
        .expect("query schema");
    assert_eq!(count, 1);
}

#[test]
fn save_assigns_ids_and_updates_summary_columns() {
    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("instances.db");
    let store = SqliteInstanceStore::open(&db_path).expect("open");

    let mut instance = store
        .save(WorkflowInstance::create(&intake(), 5).expect("create"))
        .expect("save");
    assert_eq!(instance.id(), Some(InstanceId::new(1)));

    instance.advance(6).expect("advance");
    store.save(instance.clone()).expect("resave");

    let connection = Connection::open(&db_path).expect("open raw");
    let (status, step, rows): (String, String, i64) = connection
        .query_row(
            "SELECT status, current_step, (SELECT COUNT(*) FROM workflow_instances)
             FROM workflow_instances WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("query row");
    assert_eq!(status, "awaiting_approval");
    assert_eq!(step, "Approval");
    assert_eq!(rows, 1);

    let loaded = store
        .find_by_id(InstanceId::new(1))
        .expect("find")
        .expect("present");
    assert_eq!(loaded, instance);
}

#[test]
fn find_all_returns_instances_in_id_order() {
    let temp = tempdir().expect("tempdir");
    let store = SqliteInstanceStore::open(&temp.path().join("instances.db")).expect("open");
    for n in 0..3 {
        store
            .save(WorkflowInstance::create(&intake(), n).expect("create"))
            .expect("save");
    }

    let all = store.find_all().expect("find all");
    let ids: Vec<_> = all.iter().filter_map(WorkflowInstance::id).collect();
    assert_eq!(
        ids,
        vec![InstanceId::new(1), InstanceId::new(2), InstanceId::new(3)]
    );
    assert!(store.find_by_id(InstanceId::new(9)).expect("find").is_none());
}

#[test]
fn engine_runs_against_sqlite_store() {
    let temp = tempdir().expect("tempdir");
    let store = SqliteInstanceStore::open(&temp.path().join("instances.db")).expect("open");
    let engine = WorkflowEngine::new(store, MemoryTemplateSource::with_templates([intake()]));

    let id = engine.start("intake", 0).expect("start").id().expect("id");
    let gated = engine.auto_process(id, 1).expect("auto process");
    assert_eq!(gated.current_step(), "Approval");
    assert_eq!(gated.status(), InstanceStatus::AwaitingApproval);

    engine.approve_step(id, 2).expect("approve");
    let reopened = SqliteInstanceStore::open(&temp.path().join("instances.db")).expect("reopen");
    let stored = reopened
        .find_by_id(id)
        .expect("find")
        .expect("present");
    assert_eq!(stored.current_step(), "File");
    assert_eq!(stored.status(), InstanceStatus::InProgress);
}

fn engine_over(db_path: &Path) -> WorkflowEngine<SqliteInstanceStore, MemoryTemplateSource> {
    WorkflowEngine::new(
        SqliteInstanceStore::open(db_path).expect("open"),
        MemoryTemplateSource::with_templates([intake()]),
    )
}

#[test]
fn approve_and_cancel_from_separate_engines_both_land() {
    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("instances.db");
    let approver = engine_over(&db_path);
    let canceller = engine_over(&db_path);

    for round in 0..15 {
        let id = approver.start("intake", 0).expect("start").id().expect("id");
        approver.auto_process(id, 1).expect("reach approval");

        let (approved, cancelled) = thread::scope(|scope| {
            let approve = scope.spawn(|| approver.approve_step(id, 2));
            let cancel = scope.spawn(|| canceller.cancel(id, 2, None));
            (
                approve.join().expect("approve thread"),
                cancel.join().expect("cancel thread"),
            )
        });

        cancelled.expect("cancel always succeeds");
        let stored = approver.get(id).expect("load");
        assert_eq!(stored.status(), InstanceStatus::Cancelled, "round {round}");
        match approved {
            Ok(_) => assert_eq!(stored.current_step(), "File", "round {round}"),
            Err(WorkflowError::InstanceTerminated { .. }) => {
                assert_eq!(stored.current_step(), "Approval", "round {round}")
            }
            Err(other) => panic!("unexpected approve failure: {other:?}"),
        }
    }
}
