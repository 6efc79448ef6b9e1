//! Operation: the unit of change to replica state (C3)
//!
//! Every mutation to a replica's task state is represented as one of the
//! four variants below and appended to the operations log (§3, §4.3).
//! Operations are immutable once logged; undo and sync both work by
//! computing and applying *new* operations (inverses, rebases) rather than
//! mutating history in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::TaskError;
use crate::task::Task;

/// One primitive change to task state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    Create {
        uuid: Uuid,
    },
    Update {
        uuid: Uuid,
        property: String,
        value: Option<String>,
        old_value: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Delete {
        uuid: Uuid,
        old_task: BTreeMap<String, String>,
    },
    UndoPoint,
}

impl Operation {
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Operation::Create { uuid } => Some(*uuid),
            Operation::Update { uuid, .. } => Some(*uuid),
            Operation::Delete { uuid, .. } => Some(*uuid),
            Operation::UndoPoint => None,
        }
    }

    pub fn is_undo_point(&self) -> bool {
        matches!(self, Operation::UndoPoint)
    }

    /// Invert this operation per the table in §4.3. `Delete`'s inverse is a
    /// *sequence* (Create followed by one Update per restored attribute),
    /// so this returns a `Vec`.
    pub fn invert(&self, now: DateTime<Utc>) -> Vec<Operation> {
        match self {
            Operation::Create { uuid } => vec![Operation::Delete {
                uuid: *uuid,
                old_task: BTreeMap::new(),
            }],
            Operation::Update {
                uuid,
                property,
                value,
                old_value,
                ..
            } => vec![Operation::Update {
                uuid: *uuid,
                property: property.clone(),
                value: old_value.clone(),
                old_value: value.clone(),
                timestamp: now,
            }],
            Operation::Delete { uuid, old_task } => {
                let mut ops = vec![Operation::Create { uuid: *uuid }];
                for (property, value) in old_task {
                    ops.push(Operation::Update {
                        uuid: *uuid,
                        property: property.clone(),
                        value: Some(value.clone()),
                        old_value: None,
                        timestamp: now,
                    });
                }
                ops
            }
            Operation::UndoPoint => vec![Operation::UndoPoint],
        }
    }
}

/// Apply one operation to an in-memory task table, per §4.3's "Applying an
/// Operation" rules. Absence of the target uuid on `Update`/`Delete` is
/// tolerated (sync can reorder Creates and Updates).
pub fn apply(
    tasks: &mut BTreeMap<Uuid, BTreeMap<String, String>>,
    op: &Operation,
) -> Result<(), TaskError> {
    match op {
        Operation::Create { uuid } => {
            if tasks.contains_key(uuid) {
                return Err(TaskError::AlreadyExists { id: *uuid });
            }
            tasks.insert(*uuid, BTreeMap::new());
        }
        Operation::Update { uuid, property, value, .. } => {
            if let Some(attrs) = tasks.get_mut(uuid) {
                match value {
                    Some(v) => {
                        attrs.insert(property.clone(), v.clone());
                    }
                    None => {
                        attrs.remove(property);
                    }
                }
            }
            // Absence of the uuid is tolerated (see module docs).
        }
        Operation::Delete { uuid, .. } => {
            tasks.remove(uuid);
        }
        Operation::UndoPoint => {}
    }
    Ok(())
}

/// Build the `Update`s needed to carry `task` from `old` to `new`
/// attribute values, skipping unchanged keys (§4.4 "drops no-op edits").
pub fn diff_updates(
    uuid: Uuid,
    old: &BTreeMap<String, String>,
    edits: &[(String, Option<String>)],
    timestamp: DateTime<Utc>,
) -> Vec<Operation> {
    let mut ops = Vec::new();
    for (property, value) in edits {
        let old_value = old.get(property).cloned();
        if old_value == *value {
            continue;
        }
        ops.push(Operation::Update {
            uuid,
            property: property.clone(),
            value: value.clone(),
            old_value,
            timestamp,
        });
    }
    ops
}

/// Snapshot a task's attributes for embedding in a `Delete` operation.
pub fn snapshot(task: &Task) -> BTreeMap<String, String> {
    task.attributes().clone()
}
