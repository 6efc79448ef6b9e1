//! DependencyResolver (C9)
//!
//! `blocked`/`blocking` are never stored — they are derived from `dep_<U>`
//! attributes on demand (§4.9). Cycle rejection walks the forward closure
//! of the candidate blocker before the edge is added.

use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::error::TaskError;
use crate::task::model::TaskStatus;

/// A task is blocked iff it has a `dep_<U>` attribute where `U`'s status is
/// not `completed` or `deleted`. Orphan dependencies (U absent from the
/// replica) do not block — §3 invariant 5 tolerates but does not resolve
/// them.
pub fn is_blocked(
    deps: &[Uuid],
    status_of: impl Fn(Uuid) -> Option<TaskStatus>,
) -> bool {
    deps.iter().any(|&u| match status_of(u) {
        Some(TaskStatus::Completed) | Some(TaskStatus::Deleted) => false,
        Some(_) => true,
        None => false,
    })
}

/// A task is blocking iff some other task depends on it.
pub fn is_blocking(target: Uuid, all_deps: &BTreeMap<Uuid, Vec<Uuid>>) -> bool {
    all_deps.values().any(|deps| deps.contains(&target))
}

/// Reject `from -> to` (i.e. "from depends on to") if `to`'s forward
/// dependency closure already contains `from` (§4.9).
pub fn would_cycle(
    from: Uuid,
    to: Uuid,
    deps_of: impl Fn(Uuid) -> Vec<Uuid>,
) -> Result<(), TaskError> {
    if from == to {
        return Err(TaskError::DependencyCycle { from, to });
    }
    let mut seen = HashSet::new();
    let mut stack = vec![to];
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        if current == from {
            return Err(TaskError::DependencyCycle { from, to });
        }
        stack.extend(deps_of(current));
    }
    Ok(())
}

/// Given a changed task's uuid and a full dependency map (uuid -> its
/// direct dependencies), return every task that transitively depends on
/// `changed` — the set whose derived `blocked` status needs re-evaluating
/// after `changed` completes or is deleted.
pub fn reverse_dependents(changed: Uuid, all_deps: &BTreeMap<Uuid, Vec<Uuid>>) -> Vec<Uuid> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut frontier = vec![changed];
    while let Some(target) = frontier.pop() {
        for (&task, deps) in all_deps {
            if deps.contains(&target) && seen.insert(task) {
                out.push(task);
                frontier.push(task);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_by_pending_dependency() {
        let a = Uuid::new_v4();
        assert!(is_blocked(&[a], |_| Some(TaskStatus::Pending)));
        assert!(!is_blocked(&[a], |_| Some(TaskStatus::Completed)));
        assert!(!is_blocked(&[a], |_| None));
    }

    #[test]
    fn direct_cycle_is_rejected() {
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        // t1 already depends on t2; adding t2 -> t1 would cycle.
        let deps_of = |u: Uuid| if u == t1 { vec![t2] } else { vec![] };
        assert!(would_cycle(t2, t1, deps_of).is_err());
    }

    #[test]
    fn non_cyclic_edge_is_accepted() {
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let t3 = Uuid::new_v4();
        let deps_of = |u: Uuid| if u == t2 { vec![t3] } else { vec![] };
        assert!(would_cycle(t1, t2, deps_of).is_ok());
    }

    #[test]
    fn reverse_dependents_walks_transitively() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut deps = BTreeMap::new();
        deps.insert(b, vec![a]);
        deps.insert(c, vec![b]);
        let mut affected = reverse_dependents(a, &deps);
        affected.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(affected, expected);
    }
}
