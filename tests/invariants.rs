//! Invariants and boundary behavior that must hold after every committed
//! `Replica` call.

use std::collections::BTreeMap;

use replitask::{Configuration, Replica, ReplicaError, TaskFilter, TaskStatus};
use uuid::Uuid;

fn open_replica() -> Replica {
    let dir = tempfile::tempdir().unwrap().into_path();
    Replica::open(Configuration::new(dir)).unwrap()
}

#[test]
fn working_set_holds_only_pending_and_waiting_tasks_with_no_duplicates() {
    let replica = open_replica();
    let pending = replica.new_task(TaskStatus::Pending, "pending task").unwrap();
    let done = replica.new_task(TaskStatus::Pending, "soon done").unwrap();
    replica.complete(done.uuid()).unwrap();

    replica.rebuild_working_set(true).unwrap();

    assert_eq!(replica.id_by_uuid(pending.uuid()).unwrap(), Some(1));
    assert_eq!(replica.id_by_uuid(done.uuid()).unwrap(), None);
    assert_eq!(replica.working_set_len().unwrap(), 1);
}

#[test]
fn end_timestamp_is_present_exactly_for_terminal_statuses() {
    let replica = open_replica();
    let task = replica.new_task(TaskStatus::Pending, "finish the report").unwrap();
    assert!(task.end().unwrap().is_none());

    let completed = replica.complete(task.uuid()).unwrap();
    assert!(completed.end().unwrap().is_some());

    let deleted_task = replica.new_task(TaskStatus::Pending, "cancel this one").unwrap();
    let deleted = replica.delete_task(deleted_task.uuid()).unwrap();
    assert_eq!(deleted.status().unwrap(), TaskStatus::Deleted);
    assert!(deleted.end().unwrap().is_some());
}

#[test]
fn deleting_a_task_soft_deletes_it_rather_than_erasing_the_row() {
    let replica = open_replica();
    let task = replica.new_task(TaskStatus::Pending, "old todo").unwrap();
    replica.delete_task(task.uuid()).unwrap();

    let fetched = replica.get_task(task.uuid()).unwrap().unwrap();
    assert_eq!(fetched.status().unwrap(), TaskStatus::Deleted);
}

#[test]
fn deleted_tasks_are_hard_removed_once_past_the_expiry_horizon() {
    let replica = open_replica();
    let task = replica.new_task(TaskStatus::Pending, "ancient todo").unwrap();
    replica.delete_task(task.uuid()).unwrap();

    // expire_tasks only removes rows whose `end` is older than the
    // configured horizon; a task deleted moments ago stays put.
    assert_eq!(replica.expire_tasks().unwrap(), 0);
    assert!(replica.get_task(task.uuid()).unwrap().is_some());
}

#[test]
fn undo_on_an_empty_log_returns_zero_and_changes_nothing() {
    let replica = open_replica();
    let err = replica.undo().unwrap_err();
    assert_matches::assert_matches!(err, ReplicaError::NothingToUndo);
}

#[test]
fn rebuilding_working_set_on_an_empty_replica_yields_an_empty_set() {
    let replica = open_replica();
    replica.rebuild_working_set(true).unwrap();
    assert_eq!(replica.working_set_len().unwrap(), 0);
}

#[test]
fn creating_a_task_with_empty_description_is_rejected() {
    let replica = open_replica();
    let err = replica.new_task(TaskStatus::Pending, "   ").unwrap_err();
    assert!(matches!(err, ReplicaError::Validation { .. }));
    assert!(replica.all_tasks().unwrap().is_empty());
}

#[test]
fn query_filter_only_matches_tasks_that_satisfy_every_clause() {
    let replica = open_replica();
    let home = replica.new_task(TaskStatus::Pending, "mow the lawn").unwrap();
    replica.modify(home.uuid(), replitask::TaskEdits::new().project("home")).unwrap();
    replica.new_task(TaskStatus::Pending, "write report").unwrap();

    let filter = TaskFilter::new().with_project("home");
    let matches = replica.query(&filter).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].uuid(), home.uuid());
}

#[test]
fn rebuilding_the_working_set_promotes_waiting_tasks_whose_wait_has_passed() {
    let replica = open_replica();
    let now = chrono::Utc::now();

    let mut overdue = BTreeMap::new();
    overdue.insert("status".to_string(), "waiting".to_string());
    overdue.insert("description".to_string(), "surface me now".to_string());
    overdue.insert("wait".to_string(), (now - chrono::Duration::seconds(10)).to_rfc3339());
    let overdue_task = replica.import_task(Uuid::new_v4(), overdue).unwrap();

    let mut still_future = BTreeMap::new();
    still_future.insert("status".to_string(), "waiting".to_string());
    still_future.insert("description".to_string(), "not yet".to_string());
    still_future.insert("wait".to_string(), (now + chrono::Duration::days(1)).to_rfc3339());
    let future_task = replica.import_task(Uuid::new_v4(), still_future).unwrap();

    replica.rebuild_working_set(true).unwrap();

    let promoted = replica.get_task(overdue_task.uuid()).unwrap().unwrap();
    assert_eq!(promoted.status().unwrap(), TaskStatus::Pending);
    assert!(replica.id_by_uuid(overdue_task.uuid()).unwrap().is_some());

    let untouched = replica.get_task(future_task.uuid()).unwrap().unwrap();
    assert_eq!(untouched.status().unwrap(), TaskStatus::Waiting);
}

#[test]
fn expire_tasks_is_idempotent_on_a_replica_with_nothing_to_expire() {
    let replica = open_replica();
    replica.new_task(TaskStatus::Pending, "still pending").unwrap();
    assert_eq!(replica.expire_tasks().unwrap(), 0);
    assert_eq!(replica.expire_tasks().unwrap(), 0);
}
