//! UndoEngine (C5): reverses the most recent logged group of operations.
//!
//! The log is read backward: skip trailing `UndoPoint`s, collect the
//! operations back to (but not including) the next `UndoPoint` or the log
//! head, reverse the group, and invert each operation (§4.5). Because the
//! inverses are themselves appended and logged, undo is itself
//! replicable — and, like any inverse of an inverse, undoing an undo
//! reproduces the original state.

use chrono::{DateTime, Utc};

use crate::task::Operation;

/// The last contiguous non-`UndoPoint` group in `ops` (oldest seq first),
/// or `None` if there is nothing left to undo.
pub fn last_undoable_group(ops: &[(i64, Operation)]) -> Option<Vec<(i64, Operation)>> {
    let mut end = ops.len();
    while end > 0 && ops[end - 1].1.is_undo_point() {
        end -= 1;
    }
    if end == 0 {
        return None;
    }
    let mut start = end;
    while start > 0 && !ops[start - 1].1.is_undo_point() {
        start -= 1;
    }
    Some(ops[start..end].to_vec())
}

/// Invert `group` in reverse order, producing the operations that undo it.
pub fn invert_group(group: &[(i64, Operation)], now: DateTime<Utc>) -> Vec<Operation> {
    group.iter().rev().flat_map(|(_, op)| op.invert(now)).collect()
}

/// How many undo points lie strictly after `base_version_seq` — the
/// number of undo steps that have not yet been synced away.
pub fn num_reverts_possible(ops: &[(i64, Operation)], base_version_seq: i64) -> usize {
    ops.iter()
        .filter(|(seq, op)| *seq > base_version_seq && op.is_undo_point())
        .count()
}
