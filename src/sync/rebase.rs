//! Rebase table for SyncEngine (§4.7)
//!
//! `rebase_one` runs a single local operation through one remote operation,
//! returning the (possibly rewritten) local operation, or `None` if it
//! should be dropped. `rebase_all` folds a local tail through a full
//! remote batch.

use std::hash::{Hash, Hasher};

use crate::task::Operation;

/// Rewrite `local` against one remote operation `remote`, per the table in
/// §4.7. Same-property concurrent `Update`s tie-break on timestamp, and on
/// exact timestamp equality (Open Question #2) on a stable content hash —
/// the higher hash's value wins, which is deterministic across peers
/// without needing a peer-identity concept.
pub fn rebase_one(local: Operation, remote: &Operation) -> Option<Operation> {
    let (local_uuid, remote_uuid) = (local.uuid(), remote.uuid());
    if local_uuid != remote_uuid || local_uuid.is_none() {
        return Some(local);
    }

    match (&local, remote) {
        (Operation::Create { .. }, Operation::Create { .. }) => None,
        (Operation::Delete { .. }, Operation::Delete { .. }) => None,
        (Operation::Update { .. }, Operation::Delete { .. }) => None,
        (Operation::Delete { .. }, Operation::Update { .. }) => Some(local),
        (
            Operation::Update { property: lp, .. },
            Operation::Update { property: rp, .. },
        ) if lp != rp => Some(local),
        (
            Operation::Update { uuid, property, value, old_value, timestamp },
            Operation::Update {
                value: r_value,
                old_value: r_old_value,
                timestamp: r_timestamp,
                ..
            },
        ) => {
            let local_wins = match timestamp.cmp(r_timestamp) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Less => false,
                std::cmp::Ordering::Equal => content_hash(&local) > content_hash(remote),
            };
            if local_wins {
                Some(Operation::Update {
                    uuid: *uuid,
                    property: property.clone(),
                    value: value.clone(),
                    old_value: r_value.clone(),
                    timestamp: *timestamp,
                })
            } else {
                let _ = r_old_value;
                None
            }
        }
        _ => Some(local),
    }
}

/// Rebase `local` against the full remote batch, in order.
pub fn rebase_all(local_ops: Vec<Operation>, remote_ops: &[Operation]) -> Vec<Operation> {
    local_ops
        .into_iter()
        .filter_map(|mut op| {
            for remote in remote_ops {
                match rebase_one(op, remote) {
                    Some(rewritten) => op = rewritten,
                    None => return None,
                }
            }
            Some(op)
        })
        .collect()
}

fn content_hash(op: &Operation) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    format!("{op:?}").hash(&mut hasher);
    hasher.finish()
}
