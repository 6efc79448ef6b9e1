//! Minimal task filtering (attribute equality and tag/status set
//! membership only — no sort order, pagination, project hierarchy, or
//! date ranges; those are report-layer concerns this crate doesn't own).

pub mod filter;

use crate::task::{Task, TaskStatus};
use filter::TagFilter;

/// A predicate over tasks, applied in-process by `Replica`. Every field
/// left `None`/empty is ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub project: Option<String>,
    pub tags: TagFilter,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_tags(mut self, tags: TagFilter) -> Self {
        self.tags = tags;
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if !matches!(task.status(), Ok(s) if s == status) {
                return false;
            }
        }

        if let Some(project) = &self.project {
            if task.project() != Some(project.as_str()) {
                return false;
            }
        }

        if !self.tags.matches(&task.tags()) {
            return false;
        }

        true
    }
}
