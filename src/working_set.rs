//! WorkingSet (C6): dense small-integer ids naming pending/waiting tasks.
//!
//! Index 0 is unused; ids are stable between rebuilds but not across them
//! (§4.6). The set itself is just `BTreeMap<u32, Uuid>`, persisted through
//! [`crate::storage::Storage::working_set`] /
//! [`crate::storage::Storage::replace_working_set`].

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::task::{Task, TaskStatus};

/// Rebuild the working set from `existing` and the current task list.
///
/// - `renumber = false`: tasks already in `existing` whose status is still
///   actionable keep their id; newly-actionable tasks are appended after
///   the current maximum id.
/// - `renumber = true`: every actionable task is renumbered densely
///   starting at 1, in uuid order (a stable tiebreak — callers that want a
///   different order should renumber using their own sort before calling
///   the host-facing API, since this crate owns no report/sort layer).
pub fn rebuild(existing: &BTreeMap<u32, Uuid>, tasks: &[Task], renumber: bool) -> BTreeMap<u32, Uuid> {
    let actionable: Vec<Uuid> = tasks
        .iter()
        .filter(|t| matches!(t.status(), Ok(s) if s.is_actionable()))
        .map(Task::uuid)
        .collect();

    if renumber {
        let mut sorted = actionable;
        sorted.sort();
        return sorted.into_iter().enumerate().map(|(i, uuid)| (i as u32 + 1, uuid)).collect();
    }

    let mut next = BTreeMap::new();
    let mut seen = std::collections::HashSet::new();

    for (&idx, &uuid) in existing {
        if actionable.contains(&uuid) {
            next.insert(idx, uuid);
            seen.insert(uuid);
        }
    }

    let mut cursor = next.keys().copied().max().unwrap_or(0);
    for &uuid in &actionable {
        if !seen.contains(&uuid) {
            cursor += 1;
            next.insert(cursor, uuid);
            seen.insert(uuid);
        }
    }

    next
}

pub fn uuid_by_id(set: &BTreeMap<u32, Uuid>, id: u32) -> Option<Uuid> {
    set.get(&id).copied()
}

pub fn id_by_uuid(set: &BTreeMap<u32, Uuid>, uuid: Uuid) -> Option<u32> {
    set.iter().find(|(_, &u)| u == uuid).map(|(&id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn task_with_status(status: TaskStatus) -> Task {
        let mut attrs = BTreeMap::new();
        attrs.insert("status".to_string(), status.as_str().to_string());
        Task::from_parts(Uuid::new_v4(), attrs)
    }

    #[test]
    fn non_renumbering_rebuild_preserves_existing_ids() {
        let t1 = task_with_status(TaskStatus::Pending);
        let mut existing = BTreeMap::new();
        existing.insert(3, t1.uuid());

        let rebuilt = rebuild(&existing, &[t1.clone()], false);
        assert_eq!(rebuilt.get(&3), Some(&t1.uuid()));
    }

    #[test]
    fn completed_tasks_are_dropped_from_the_set() {
        let pending = task_with_status(TaskStatus::Pending);
        let completed = task_with_status(TaskStatus::Completed);
        let mut existing = BTreeMap::new();
        existing.insert(1, pending.uuid());
        existing.insert(2, completed.uuid());

        let rebuilt = rebuild(&existing, &[pending.clone(), completed], false);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.get(&1), Some(&pending.uuid()));
    }

    #[test]
    fn renumber_compacts_to_dense_range_starting_at_one() {
        let t1 = task_with_status(TaskStatus::Pending);
        let t2 = task_with_status(TaskStatus::Waiting);
        let mut existing = BTreeMap::new();
        existing.insert(5, t1.uuid());
        existing.insert(9, t2.uuid());

        let rebuilt = rebuild(&existing, &[t1, t2], true);
        let ids: Vec<u32> = rebuilt.keys().copied().collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
