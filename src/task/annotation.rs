//! Timestamped notes attached to a task.
//!
//! Annotations are not a reserved top-level attribute (§3); each one is
//! stored as an `annotation_<epoch>` key on the task's attribute map, with
//! `Annotation` as the structured view `Task::annotations()` projects them
//! into on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub entry: DateTime<Utc>,
    pub description: String,
}

impl Annotation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            entry: Utc::now(),
            description: description.into(),
        }
    }

    /// The attribute key this annotation is stored under. Two annotations
    /// added within the same second collide onto one key — callers that
    /// need finer resolution should space out calls accordingly, the same
    /// constraint `remove_annotation`'s epoch-second argument implies.
    pub fn attribute_key(&self) -> String {
        format!("annotation_{}", self.entry.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_key_is_derived_from_the_entry_second() {
        let entry = Utc::now();
        let annotation = Annotation {
            entry,
            description: "call the plumber".to_string(),
        };
        assert_eq!(annotation.attribute_key(), format!("annotation_{}", entry.timestamp()));
    }

    #[test]
    fn new_stamps_the_current_time() {
        let before = Utc::now();
        let annotation = Annotation::new("note");
        assert!(annotation.entry >= before);
    }
}
