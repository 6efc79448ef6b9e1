//! Replica (C4): the orchestrator. Every public method is atomic — it
//! opens one `Storage` transaction, produces `Operation`s, applies them to
//! task state, appends them to the log, and commits; on any error nothing
//! is appended and nothing is committed (§4.4, §7).

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::config::Configuration;
use crate::error::{ReplicaError, TaskError, ValidationError};
use crate::query::TaskFilter;
use crate::storage::Storage;
use crate::sync::transport::SyncTransport;
use crate::sync::{SyncEngine, SyncReport};
use crate::task::model::format_attr_instant;
use crate::task::operation::{apply, diff_updates, snapshot};
use crate::task::{dependency, recurrence, urgency, Operation, Task, TaskEdits, TaskStatus};
use crate::undo;
use crate::working_set;

/// The replicated task store. Owns its `Storage` exclusively for its
/// lifetime (§5); there is no shared mutable state beyond what `Storage`
/// itself persists.
pub struct Replica {
    storage: Storage,
    config: Configuration,
}

impl Replica {
    pub fn open(config: Configuration) -> Result<Self, ReplicaError> {
        let storage = Storage::open(&config.data_dir)?;
        Ok(Self { storage, config })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    // -- reads -----------------------------------------------------------

    pub fn get_task(&self, uuid: Uuid) -> Result<Option<Task>, ReplicaError> {
        Ok(self.storage.get_task(uuid)?)
    }

    pub fn all_tasks(&self) -> Result<Vec<Task>, ReplicaError> {
        self.expand_due_recurrence()?;
        Ok(self.storage.all_tasks()?)
    }

    pub fn all_task_uuids(&self) -> Result<Vec<Uuid>, ReplicaError> {
        Ok(self.all_tasks()?.into_iter().map(|t| t.uuid()).collect())
    }

    pub fn pending_tasks(&self) -> Result<Vec<Task>, ReplicaError> {
        let filter = TaskFilter::new().with_status(TaskStatus::Pending);
        Ok(self.all_tasks()?.into_iter().filter(|t| filter.matches(t)).collect())
    }

    pub fn query(&self, filter: &TaskFilter) -> Result<Vec<Task>, ReplicaError> {
        Ok(self.all_tasks()?.into_iter().filter(|t| filter.matches(t)).collect())
    }

    /// Urgency for `task`, filling in the dependency-graph facts `Task`
    /// alone can't derive.
    pub fn urgency(&self, task: &Task) -> Result<f64, ReplicaError> {
        let all_deps = self.all_dependency_edges()?;
        let ctx = urgency::UrgencyContext {
            is_blocking: dependency::is_blocking(task.uuid(), &all_deps),
            is_blocked: dependency::is_blocked(&task.dependencies(), |u| {
                self.storage.get_task(u).ok().flatten().and_then(|t| t.status().ok())
            }),
        };
        Ok(urgency::urgency(task, &self.config.urgency, ctx, Utc::now()))
    }

    fn all_dependency_edges(&self) -> Result<BTreeMap<Uuid, Vec<Uuid>>, ReplicaError> {
        Ok(self.storage.all_tasks()?.into_iter().map(|t| (t.uuid(), t.dependencies())).collect())
    }

    // -- mutation ----------------------------------------------------------

    pub fn new_task(&self, status: TaskStatus, description: impl Into<String>) -> Result<Task, ReplicaError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription.into());
        }

        let uuid = Uuid::new_v4();
        let now = Utc::now();
        let attrs = [
            ("status".to_string(), status.as_str().to_string()),
            ("description".to_string(), description),
            ("entry".to_string(), format_attr_instant(now)),
            ("modified".to_string(), format_attr_instant(now)),
        ];

        self.storage.transaction(|| {
            self.append_and_apply(&Operation::Create { uuid })?;
            for (property, value) in &attrs {
                self.append_and_apply(&Operation::Update {
                    uuid,
                    property: property.clone(),
                    value: Some(value.clone()),
                    old_value: None,
                    timestamp: now,
                })?;
            }
            Ok::<(), ReplicaError>(())
        })?;

        Ok(self.storage.get_task(uuid)?.expect("just created"))
    }

    pub fn import_task(&self, uuid: Uuid, attributes: BTreeMap<String, String>) -> Result<Task, ReplicaError> {
        if self.storage.get_task(uuid)?.is_some() {
            return Err(TaskError::DuplicateUuid { id: uuid }.into());
        }
        let now = Utc::now();

        self.storage.transaction(|| {
            self.append_and_apply(&Operation::Create { uuid })?;
            for (property, value) in &attributes {
                self.append_and_apply(&Operation::Update {
                    uuid,
                    property: property.clone(),
                    value: Some(value.clone()),
                    old_value: None,
                    timestamp: now,
                })?;
            }
            Ok::<(), ReplicaError>(())
        })?;

        Ok(self.storage.get_task(uuid)?.expect("just imported"))
    }

    /// Apply `edits` to `uuid`, dropping no-op edits (§4.4). Fails
    /// `TaskNotFound` if the task is deleted or never existed.
    pub fn modify(&self, uuid: Uuid, edits: TaskEdits) -> Result<Task, ReplicaError> {
        let current = self.storage.get_task(uuid)?.ok_or(TaskError::NotFound { id: uuid })?;
        let now = Utc::now();
        let mut ops = diff_updates(uuid, current.attributes(), &edits.into_edits(), now);
        if ops.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }
        ops.push(Operation::Update {
            uuid,
            property: "modified".to_string(),
            value: Some(format_attr_instant(now)),
            old_value: current.get("modified").map(str::to_string),
            timestamp: now,
        });

        self.storage.transaction(|| {
            for op in &ops {
                self.append_and_apply(op)?;
            }
            Ok::<(), ReplicaError>(())
        })?;

        Ok(self.storage.get_task(uuid)?.expect("just modified"))
    }

    pub fn start(&self, uuid: Uuid) -> Result<Task, ReplicaError> {
        self.modify(uuid, TaskEdits::new().set("start", format_attr_instant(Utc::now())))
    }

    pub fn stop(&self, uuid: Uuid) -> Result<Task, ReplicaError> {
        self.modify(uuid, TaskEdits::new().remove("start"))
    }

    pub fn complete(&self, uuid: Uuid) -> Result<Task, ReplicaError> {
        let now = format_attr_instant(Utc::now());
        let task = self.modify(uuid, TaskEdits::new().status(TaskStatus::Completed).set("end", now))?;
        self.reevaluate_dependents(uuid)?;
        Ok(task)
    }

    /// Soft-delete: mark `uuid` `status=deleted` and stamp `end` if it
    /// isn't already set, mirroring `CmdDelete`'s behavior rather than
    /// erasing the row — a deleted task still exists for undo, sync, and
    /// `expire_tasks` (which does the eventual hard removal).
    pub fn delete_task(&self, uuid: Uuid) -> Result<Task, ReplicaError> {
        let current = self.storage.get_task(uuid)?.ok_or(TaskError::NotFound { id: uuid })?;
        let mut edits = TaskEdits::new().status(TaskStatus::Deleted);
        if current.end()?.is_none() {
            edits = edits.set("end", format_attr_instant(Utc::now()));
        }
        let task = self.modify(uuid, edits)?;
        self.reevaluate_dependents(uuid)?;
        Ok(task)
    }

    pub fn add_tag(&self, uuid: Uuid, tag: &str) -> Result<Task, ReplicaError> {
        self.modify(uuid, TaskEdits::new().add_tag(tag))
    }

    pub fn remove_tag(&self, uuid: Uuid, tag: &str) -> Result<Task, ReplicaError> {
        self.modify(uuid, TaskEdits::new().remove_tag(tag))
    }

    pub fn add_annotation(&self, uuid: Uuid, text: impl Into<String>) -> Result<Task, ReplicaError> {
        let annotation = crate::task::Annotation::new(text);
        self.modify(uuid, TaskEdits::new().set(annotation.attribute_key(), annotation.description))
    }

    pub fn remove_annotation(&self, uuid: Uuid, epoch_seconds: i64) -> Result<Task, ReplicaError> {
        self.modify(uuid, TaskEdits::new().remove(format!("annotation_{epoch_seconds}")))
    }

    /// Add a dependency `from -> to` ("`from` depends on `to`"), rejecting
    /// cycles per §4.9.
    pub fn add_dependency(&self, from: Uuid, to: Uuid) -> Result<Task, ReplicaError> {
        let all_deps = self.all_dependency_edges()?;
        dependency::would_cycle(from, to, |u| all_deps.get(&u).cloned().unwrap_or_default())?;
        self.modify(from, TaskEdits::new().add_dependency(to))
    }

    pub fn remove_dependency(&self, from: Uuid, to: Uuid) -> Result<Task, ReplicaError> {
        self.modify(from, TaskEdits::new().remove_dependency(to))
    }

    fn reevaluate_dependents(&self, changed: Uuid) -> Result<(), ReplicaError> {
        // blocked/blocking are derived on read (§4.9); nothing to persist,
        // but touch the chain so callers relying on `modified` see the
        // dependents as having been visited.
        let all_deps = self.all_dependency_edges()?;
        let _ = dependency::reverse_dependents(changed, &all_deps);
        Ok(())
    }

    // -- undo --------------------------------------------------------------

    pub fn add_undo_point(&self, force: bool) -> Result<(), ReplicaError> {
        let ops = self.storage.all_operations()?;
        if !force && ops.last().is_some_and(|(_, op)| op.is_undo_point()) {
            return Ok(());
        }
        self.storage.transaction(|| self.append_and_apply(&Operation::UndoPoint))?;
        Ok(())
    }

    /// Invert the last undoable group. Returns the number of operations
    /// inverted.
    pub fn undo(&self) -> Result<usize, ReplicaError> {
        let ops = self.storage.all_operations()?;
        let group = undo::last_undoable_group(&ops).ok_or(ReplicaError::NothingToUndo)?;
        let now = Utc::now();
        let inverses = undo::invert_group(&group, now);
        let count = group.len();

        self.storage.transaction(|| {
            for op in &inverses {
                self.append_and_apply(op)?;
            }
            self.append_and_apply(&Operation::UndoPoint)?;
            Ok::<(), ReplicaError>(())
        })?;

        Ok(count)
    }

    pub fn num_reverts_possible(&self) -> Result<usize, ReplicaError> {
        let ops = self.storage.all_operations()?;
        let base_seq = self.base_version_seq()?;
        Ok(undo::num_reverts_possible(&ops, base_seq))
    }

    pub fn num_local_changes(&self) -> Result<usize, ReplicaError> {
        let base_seq = self.base_version_seq()?;
        Ok(self.storage.operations_since(base_seq)?.into_iter().filter(|(_, op)| !op.is_undo_point()).count())
    }

    fn base_version_seq(&self) -> Result<i64, ReplicaError> {
        Ok(self.storage.get_meta("base_version_seq")?.and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    // -- working set ---------------------------------------------------------

    pub fn rebuild_working_set(&self, renumber: bool) -> Result<(), ReplicaError> {
        self.expand_due_recurrence()?;
        self.promote_waiting_tasks()?;
        let existing = self.storage.working_set()?;
        let tasks = self.storage.all_tasks()?;
        let rebuilt = working_set::rebuild(&existing, &tasks, renumber);
        self.storage.replace_working_set(&rebuilt)?;
        Ok(())
    }

    /// `waiting` tasks whose `wait` has passed become `pending` (§4.4),
    /// so they're eligible for the working set rebuild that follows.
    fn promote_waiting_tasks(&self) -> Result<(), ReplicaError> {
        let now = Utc::now();
        let due_for_promotion: Vec<Uuid> = self
            .storage
            .all_tasks()?
            .into_iter()
            .filter(|t| matches!(t.status(), Ok(TaskStatus::Waiting)) && matches!(t.wait(), Ok(Some(wait)) if wait <= now))
            .map(|t| t.uuid())
            .collect();

        for uuid in due_for_promotion {
            self.modify(uuid, TaskEdits::new().status(TaskStatus::Pending))?;
        }
        Ok(())
    }

    pub fn working_set_len(&self) -> Result<usize, ReplicaError> {
        Ok(self.storage.working_set()?.len())
    }

    pub fn uuid_by_id(&self, id: u32) -> Result<Option<Uuid>, ReplicaError> {
        Ok(working_set::uuid_by_id(&self.storage.working_set()?, id))
    }

    pub fn id_by_uuid(&self, uuid: Uuid) -> Result<Option<u32>, ReplicaError> {
        Ok(working_set::id_by_uuid(&self.storage.working_set()?, uuid))
    }

    // -- recurrence ----------------------------------------------------------

    fn expand_due_recurrence(&self) -> Result<(), ReplicaError> {
        let now = Utc::now();
        let recurring: Vec<Task> = self
            .storage
            .all_tasks()?
            .into_iter()
            .filter(|t| matches!(t.status(), Ok(TaskStatus::Recurring)))
            .collect();

        for parent in recurring {
            let ops = recurrence::expand(&parent, now)?;
            if ops.is_empty() {
                continue;
            }
            self.storage.transaction(|| {
                for op in &ops {
                    self.append_and_apply(op)?;
                }
                Ok::<(), ReplicaError>(())
            })?;
        }
        Ok(())
    }

    // -- expiry --------------------------------------------------------------

    /// Permanently remove tasks `completed`/`deleted` for longer than
    /// `config.expiry_horizon`.
    pub fn expire_tasks(&self) -> Result<usize, ReplicaError> {
        let now = Utc::now();
        let horizon = self.config.expiry_horizon;
        let mut expired = 0;

        for task in self.storage.all_tasks()? {
            let terminal = matches!(task.status(), Ok(TaskStatus::Completed) | Ok(TaskStatus::Deleted));
            if !terminal {
                continue;
            }
            let Ok(Some(end)) = task.end() else { continue };
            if now - end < horizon {
                continue;
            }
            self.storage.transaction(|| {
                self.append_and_apply(&Operation::Delete { uuid: task.uuid(), old_task: snapshot(&task) })
            })?;
            expired += 1;
        }
        Ok(expired)
    }

    // -- sync ------------------------------------------------------------------

    pub fn sync(&self, transport: &dyn SyncTransport) -> Result<SyncReport, ReplicaError> {
        if self.config.sync.is_none() {
            return Err(crate::error::SyncError::NotConfigured.into());
        }

        let base_version = self.storage.get_meta("base_version")?.unwrap_or_else(|| "ROOT".to_string());
        let base_seq = self.base_version_seq()?;
        let tail: Vec<Operation> = self.storage.operations_since(base_seq)?.into_iter().map(|(_, op)| op).collect();

        let before: Vec<Uuid> = self.storage.all_tasks()?.into_iter().map(|t| t.uuid()).collect();
        let mut tasks: BTreeMap<Uuid, BTreeMap<String, String>> =
            self.storage.all_tasks()?.into_iter().map(|t| (t.uuid(), t.attributes().clone())).collect();

        let engine = SyncEngine::new(transport);
        let (rebased_tail, report) = engine.sync(&base_version, tail, &mut tasks)?;

        // `engine.sync` only applies pulled remote operations to `tasks`;
        // the surviving (rebased) local tail still needs to be folded in so
        // the rows written back reflect it too, not just the remote state.
        for op in &rebased_tail {
            apply(&mut tasks, op)?;
        }
        let deleted: Vec<Uuid> = before.into_iter().filter(|u| !tasks.contains_key(u)).collect();

        self.storage.transaction(|| {
            for (uuid, attrs) in &tasks {
                self.storage.put_task(&Task::from_parts(*uuid, attrs.clone()))?;
            }
            for uuid in &deleted {
                self.storage.remove_task(*uuid)?;
            }
            for op in &rebased_tail {
                self.storage.append_operation(op)?;
            }
            let new_seq = self.storage.last_sequence()?;
            self.storage.set_meta("base_version", &report.new_base_version)?;
            self.storage.set_meta("base_version_seq", &new_seq.to_string())?;
            Ok::<(), ReplicaError>(())
        })?;

        Ok(report)
    }

    // -- internals ---------------------------------------------------------

    fn append_and_apply(&self, op: &Operation) -> Result<(), ReplicaError> {
        let mut table: BTreeMap<Uuid, BTreeMap<String, String>> = match op.uuid() {
            Some(uuid) => self
                .storage
                .get_task(uuid)?
                .map(|t| BTreeMap::from([(uuid, t.attributes().clone())]))
                .unwrap_or_default(),
            None => BTreeMap::new(),
        };

        apply(&mut table, op)?;
        self.storage.append_operation(op)?;

        match op.uuid() {
            Some(uuid) => match table.get(&uuid) {
                Some(attrs) => self.storage.put_task(&Task::from_parts(uuid, attrs.clone()))?,
                None => self.storage.remove_task(uuid)?,
            },
            None => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_replica() -> Replica {
        let dir = tempfile::tempdir().unwrap().into_path();
        Replica::open(Configuration::new(dir)).unwrap()
    }

    #[test]
    fn new_task_round_trips_through_storage() {
        let replica = open_test_replica();
        let task = replica.new_task(TaskStatus::Pending, "buy milk").unwrap();
        let fetched = replica.get_task(task.uuid()).unwrap().unwrap();
        assert_eq!(fetched.description(), "buy milk");
        assert_eq!(fetched.status().unwrap(), TaskStatus::Pending);
    }

    #[test]
    fn empty_description_is_rejected() {
        let replica = open_test_replica();
        assert!(replica.new_task(TaskStatus::Pending, "   ").is_err());
    }

    #[test]
    fn modify_then_undo_restores_previous_value() {
        let replica = open_test_replica();
        let task = replica.new_task(TaskStatus::Pending, "call mom").unwrap();
        replica.add_undo_point(true).unwrap();
        replica.modify(task.uuid(), TaskEdits::new().project("home")).unwrap();
        assert_eq!(replica.get_task(task.uuid()).unwrap().unwrap().project(), Some("home"));

        let inverted = replica.undo().unwrap();
        assert!(inverted > 0);
        assert_eq!(replica.get_task(task.uuid()).unwrap().unwrap().project(), None);
    }

    #[test]
    fn create_then_undo_removes_the_new_task_but_keeps_the_earlier_one() {
        let replica = open_test_replica();
        let first = replica.new_task(TaskStatus::Pending, "buy milk").unwrap();
        replica.add_undo_point(true).unwrap();
        let second = replica.new_task(TaskStatus::Pending, "call mom").unwrap();

        let inverted = replica.undo().unwrap();
        assert!(inverted > 0);
        assert!(replica.get_task(second.uuid()).unwrap().is_none());
        assert!(replica.get_task(first.uuid()).unwrap().is_some());
    }

    #[test]
    fn complete_sets_status_and_end() {
        let replica = open_test_replica();
        let task = replica.new_task(TaskStatus::Pending, "ship it").unwrap();
        let completed = replica.complete(task.uuid()).unwrap();
        assert_eq!(completed.status().unwrap(), TaskStatus::Completed);
        assert!(completed.end().unwrap().is_some());
    }

    #[test]
    fn dependency_cycle_is_rejected() {
        let replica = open_test_replica();
        let t1 = replica.new_task(TaskStatus::Pending, "t1").unwrap();
        let t2 = replica.new_task(TaskStatus::Pending, "t2").unwrap();
        replica.add_dependency(t1.uuid(), t2.uuid()).unwrap();
        assert!(replica.add_dependency(t2.uuid(), t1.uuid()).is_err());
    }

    #[test]
    fn rebuild_working_set_includes_pending_tasks() {
        let replica = open_test_replica();
        let task = replica.new_task(TaskStatus::Pending, "in the set").unwrap();
        replica.rebuild_working_set(true).unwrap();
        assert_eq!(replica.id_by_uuid(task.uuid()).unwrap(), Some(1));
    }

    #[test]
    fn modifying_missing_task_fails_not_found() {
        let replica = open_test_replica();
        let err = replica.modify(Uuid::new_v4(), TaskEdits::new().project("x")).unwrap_err();
        assert_matches::assert_matches!(err, ReplicaError::Task { source: TaskError::NotFound { .. } });
    }
}
