//! RecurrenceExpander (C8)
//!
//! A recurring task carries `recur` (signed seconds), `due`, and `mask` (one
//! character per child minted so far). Expansion mints a pending child for
//! every multiple of `recur` that has come due, advancing
//! `next_due = due + mask.len() * recur` (§4.8) and appending one `-` to
//! `mask` per child, so repeated calls within the same second are a no-op.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::TaskError;
use crate::task::model::TaskStatus;
use crate::task::operation::Operation;
use crate::task::Task;

/// Attributes that are inherited by a freshly-minted child, rather than
/// left for the user to fill in again.
const INHERITED: &[&str] = &["description", "project", "priority"];

/// Compute the operations needed to expand `parent` (a `status=recurring`
/// task) up to `now`. Returns an empty vec if `parent` is not recurring,
/// has no `due`/`recur`, or is not yet due for its next child.
pub fn expand(parent: &Task, now: DateTime<Utc>) -> Result<Vec<Operation>, TaskError> {
    if !matches!(parent.status(), Ok(TaskStatus::Recurring)) {
        return Ok(Vec::new());
    }

    let due = match parent.due()? {
        Some(d) => d,
        None => return Ok(Vec::new()),
    };
    let recur = match parent.recur()? {
        Some(r) if r != 0 => r,
        _ => return Ok(Vec::new()),
    };

    let mut ops = Vec::new();
    let mut mask_len = parent.mask().len() as i64;
    let mut next_due = due + chrono::Duration::seconds(mask_len * recur);
    let mut running_mask = parent.mask().to_string();

    while next_due <= now {
        let child_uuid = Uuid::new_v4();
        ops.push(Operation::Create { uuid: child_uuid });

        let mut attrs: BTreeMap<String, String> = BTreeMap::new();
        attrs.insert("status".to_string(), TaskStatus::Pending.as_str().to_string());
        attrs.insert("due".to_string(), crate::task::model::format_attr_instant(next_due));
        attrs.insert("parent".to_string(), parent.uuid().to_string());
        attrs.insert("imask".to_string(), mask_len.to_string());
        for &key in INHERITED {
            if let Some(value) = parent.get(key) {
                attrs.insert(key.to_string(), value.to_string());
            }
        }
        for tag in parent.tags() {
            attrs.insert(format!("tag_{tag}"), "x".to_string());
        }

        for (property, value) in attrs {
            ops.push(Operation::Update {
                uuid: child_uuid,
                property,
                value: Some(value),
                old_value: None,
                timestamp: now,
            });
        }

        let extended_mask = format!("{running_mask}-");
        ops.push(Operation::Update {
            uuid: parent.uuid(),
            property: "mask".to_string(),
            value: Some(extended_mask.clone()),
            old_value: Some(running_mask.clone()),
            timestamp: now,
        });
        running_mask = extended_mask;

        mask_len += 1;
        next_due = due + chrono::Duration::seconds(mask_len * recur);
    }

    Ok(ops)
}
