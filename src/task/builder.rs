//! Task edit accumulator
//!
//! Per §4.2, `Task::set`/`Task::remove` do not themselves touch storage —
//! they accumulate pending edits that `Replica::modify` later turns into
//! `Update` operations inside one transaction. `TaskEdits` is that
//! accumulator.

use crate::task::model::{Priority, TaskStatus};
use uuid::Uuid;

/// A fluent accumulator of attribute edits, applied atomically by
/// `Replica::modify`.
#[derive(Debug, Clone, Default)]
pub struct TaskEdits {
    pub(crate) edits: Vec<(String, Option<String>)>,
}

impl TaskEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.edits.push((name.into(), Some(value.into())));
        self
    }

    /// Remove `name` entirely.
    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.edits.push((name.into(), None));
        self
    }

    pub fn status(self, status: TaskStatus) -> Self {
        self.set("status", status.as_str())
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.set("description", description.into())
    }

    pub fn project(self, project: impl Into<String>) -> Self {
        self.set("project", project.into())
    }

    pub fn priority(self, priority: Priority) -> Self {
        self.set("priority", priority.as_str())
    }

    pub fn add_tag(self, tag: impl AsRef<str>) -> Self {
        self.set(format!("tag_{}", tag.as_ref()), "x")
    }

    pub fn remove_tag(self, tag: impl AsRef<str>) -> Self {
        self.remove(format!("tag_{}", tag.as_ref()))
    }

    pub fn add_dependency(self, uuid: Uuid) -> Self {
        self.set(format!("dep_{uuid}"), "x")
    }

    pub fn remove_dependency(self, uuid: Uuid) -> Self {
        self.remove(format!("dep_{uuid}"))
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn into_edits(self) -> Vec<(String, Option<String>)> {
        self.edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluent_builder_accumulates_edits() {
        let edits = TaskEdits::new()
            .description("call mom")
            .project("home")
            .add_tag("urgent")
            .into_edits();

        assert_eq!(edits.len(), 3);
        assert_eq!(edits[0], ("description".to_string(), Some("call mom".to_string())));
        assert_eq!(edits[2], ("tag_urgent".to_string(), Some("x".to_string())));
    }

    #[test]
    fn empty_builder_reports_empty() {
        assert!(TaskEdits::new().is_empty());
        assert!(!TaskEdits::new().project("x").is_empty());
    }
}
