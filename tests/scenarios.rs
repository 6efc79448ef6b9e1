//! End-to-end scenarios against the public `Replica` API.

use std::collections::BTreeMap;

use replitask::{Configuration, Replica, ReplicaError, TaskEdits, TaskStatus};
use uuid::Uuid;

fn open_replica() -> Replica {
    let dir = tempfile::tempdir().unwrap().into_path();
    Replica::open(Configuration::new(dir)).unwrap()
}

#[test]
fn s1_create_then_undo() {
    let replica = open_replica();
    let milk = replica.new_task(TaskStatus::Pending, "buy milk").unwrap();
    replica.rebuild_working_set(true).unwrap();
    assert_eq!(replica.id_by_uuid(milk.uuid()).unwrap(), Some(1));

    replica.add_undo_point(true).unwrap();
    let mom = replica.new_task(TaskStatus::Pending, "call mom").unwrap();
    assert_eq!(replica.all_tasks().unwrap().len(), 2);

    let inverted = replica.undo().unwrap();
    assert!(inverted >= 1);
    assert!(replica.get_task(mom.uuid()).unwrap().is_none());
    assert!(replica.get_task(milk.uuid()).unwrap().is_some());
}

#[test]
fn s2_modify_idempotence() {
    let replica = open_replica();
    let task = replica.new_task(TaskStatus::Pending, "paint the fence").unwrap();

    let first = replica.modify(task.uuid(), TaskEdits::new().project("home")).unwrap();
    let modified_after_first = first.modified().unwrap();

    let second = replica.modify(task.uuid(), TaskEdits::new().project("home"));
    assert!(matches!(second, Err(ReplicaError::Validation { .. })));

    let unchanged = replica.get_task(task.uuid()).unwrap().unwrap();
    assert_eq!(unchanged.modified().unwrap(), modified_after_first);
}

#[test]
fn s3_recurrence_expansion_is_idempotent_within_the_same_tick() {
    let replica = open_replica();
    let now = chrono::Utc::now();
    let mut attrs = BTreeMap::new();
    attrs.insert("status".to_string(), "recurring".to_string());
    attrs.insert("description".to_string(), "water the plants".to_string());
    // Overdue by recur - 30s: exactly one instance is due, and the next
    // one stays comfortably in the future across both expansion calls below.
    attrs.insert("due".to_string(), (now - chrono::Duration::seconds(86_400 - 30)).to_rfc3339());
    attrs.insert("recur".to_string(), "86400".to_string());
    let parent = replica.import_task(Uuid::new_v4(), attrs).unwrap();

    let first_pass = replica.all_tasks().unwrap();
    let children: Vec<_> = first_pass.iter().filter(|t| t.parent().unwrap() == Some(parent.uuid())).collect();
    assert_eq!(children.len(), 1);
    let child = children[0];
    assert_eq!(child.status().unwrap(), TaskStatus::Pending);
    assert_eq!(child.imask().unwrap(), Some(0));

    let reexpanded_parent = replica.get_task(parent.uuid()).unwrap().unwrap();
    assert_eq!(reexpanded_parent.mask(), "-");

    let second_pass = replica.all_tasks().unwrap();
    let children_again: Vec<_> = second_pass.iter().filter(|t| t.parent().unwrap() == Some(parent.uuid())).collect();
    assert_eq!(children_again.len(), 1, "expansion must not mint a second child on the same tick");
}

#[test]
fn s5_dependency_cycle_rejection() {
    let replica = open_replica();
    let t1 = replica.new_task(TaskStatus::Pending, "t1").unwrap();
    let t2 = replica.new_task(TaskStatus::Pending, "t2").unwrap();

    replica.add_dependency(t1.uuid(), t2.uuid()).unwrap();
    let before = replica.num_local_changes().unwrap();

    let err = replica.add_dependency(t2.uuid(), t1.uuid()).unwrap_err();
    assert!(matches!(err, ReplicaError::Task { .. }));
    assert_eq!(replica.num_local_changes().unwrap(), before, "a rejected cycle must not append an Update");
}

#[test]
fn s6_working_set_stability_across_renumbering() {
    let replica = open_replica();
    let t1 = replica.new_task(TaskStatus::Pending, "t1").unwrap();
    let t2 = replica.new_task(TaskStatus::Pending, "t2").unwrap();
    let t3 = replica.new_task(TaskStatus::Pending, "t3").unwrap();
    replica.rebuild_working_set(true).unwrap();

    let id1 = replica.id_by_uuid(t1.uuid()).unwrap().unwrap();
    let id3 = replica.id_by_uuid(t3.uuid()).unwrap().unwrap();

    replica.complete(t2.uuid()).unwrap();
    replica.rebuild_working_set(false).unwrap();
    assert_eq!(replica.id_by_uuid(t1.uuid()).unwrap(), Some(id1));
    assert_eq!(replica.id_by_uuid(t3.uuid()).unwrap(), Some(id3));
    assert_eq!(replica.id_by_uuid(t2.uuid()).unwrap(), None);

    replica.rebuild_working_set(true).unwrap();
    assert_eq!(replica.working_set_len().unwrap(), 2);
}
