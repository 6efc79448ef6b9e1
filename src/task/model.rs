//! Task model definitions
//!
//! A [`Task`] is a uuid plus an ordered mapping of attribute name to string
//! value (§3 of the design). All values are strings at rest; this module
//! provides typed accessors that parse on read, so unknown attributes stay
//! string-only and round-trip untouched.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::TaskError;
use crate::task::Annotation;

/// Task status enumeration (§3 reserved attribute `status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Deleted,
    Recurring,
    Waiting,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Deleted => "deleted",
            TaskStatus::Recurring => "recurring",
            TaskStatus::Waiting => "waiting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "completed" => Some(TaskStatus::Completed),
            "deleted" => Some(TaskStatus::Deleted),
            "recurring" => Some(TaskStatus::Recurring),
            "waiting" => Some(TaskStatus::Waiting),
            _ => None,
        }
    }

    /// True for statuses that belong in the working set (§4.6 invariant 2).
    pub fn is_actionable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Waiting)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Task priority. Not a reserved attribute in §3's table, but used by
/// urgency (§4.2) and common enough in practice that it gets a typed
/// accessor the same way the reserved attributes do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "H")]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "L",
            Priority::Medium => "M",
            Priority::High => "H",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "L" => Some(Priority::Low),
            "M" => Some(Priority::Medium),
            "H" => Some(Priority::High),
            _ => None,
        }
    }
}

fn format_instant(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<i64>().ok().and_then(|secs| Utc.timestamp_opt(secs, 0).single()))
}

/// The central Task entity: a uuid and an ordered string->string attribute
/// map (§3). Immutable once handed to a caller — mutation goes through
/// [`crate::task::builder::TaskEdits`] and `Replica::modify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub(crate) uuid: Uuid,
    pub(crate) attributes: BTreeMap<String, String>,
}

impl Task {
    /// Construct a task directly from its uuid and attribute map. Used by
    /// storage when materializing a row; prefer `Replica::new_task` for
    /// creating genuinely new tasks.
    pub fn from_parts(uuid: Uuid, attributes: BTreeMap<String, String>) -> Self {
        Self { uuid, attributes }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Raw attribute lookup. Unknown attributes are preserved verbatim and
    /// reachable only through this accessor.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn status(&self) -> Result<TaskStatus, TaskError> {
        let raw = self.get("status").unwrap_or("pending");
        TaskStatus::parse(raw).ok_or_else(|| TaskError::BadAttributeValue {
            attribute: "status".into(),
            value: raw.into(),
        })
    }

    pub fn description(&self) -> &str {
        self.get("description").unwrap_or("")
    }

    fn parse_instant_attr(&self, name: &str) -> Result<Option<DateTime<Utc>>, TaskError> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => parse_instant(raw).map(Some).ok_or_else(|| TaskError::BadAttributeValue {
                attribute: name.into(),
                value: raw.into(),
            }),
        }
    }

    pub fn entry(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("entry")
    }

    pub fn modified(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("modified")
    }

    pub fn start(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("start")
    }

    pub fn end(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("end")
    }

    pub fn due(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("due")
    }

    pub fn wait(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("wait")
    }

    pub fn scheduled(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("scheduled")
    }

    pub fn until(&self) -> Result<Option<DateTime<Utc>>, TaskError> {
        self.parse_instant_attr("until")
    }

    /// `recur`'s grammar is a signed second count (surface syntax like
    /// "weekly" is a CLI concern, out of scope here).
    pub fn recur(&self) -> Result<Option<i64>, TaskError> {
        match self.get("recur") {
            None => Ok(None),
            Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| TaskError::BadAttributeValue {
                attribute: "recur".into(),
                value: raw.into(),
            }),
        }
    }

    pub fn mask(&self) -> &str {
        self.get("mask").unwrap_or("")
    }

    pub fn imask(&self) -> Result<Option<u32>, TaskError> {
        match self.get("imask") {
            None => Ok(None),
            Some(raw) => raw.parse::<u32>().map(Some).map_err(|_| TaskError::BadAttributeValue {
                attribute: "imask".into(),
                value: raw.into(),
            }),
        }
    }

    pub fn parent(&self) -> Result<Option<Uuid>, TaskError> {
        match self.get("parent") {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| TaskError::BadAttributeValue {
                attribute: "parent".into(),
                value: raw.into(),
            }),
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.get("project")
    }

    pub fn priority(&self) -> Option<Priority> {
        self.get("priority").and_then(Priority::parse)
    }

    /// Tags are derived from `tag_<name>` keys whose value is `"x"`.
    pub fn tags(&self) -> Vec<&str> {
        self.attributes
            .keys()
            .filter_map(|k| k.strip_prefix("tag_"))
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.attributes.contains_key(&format!("tag_{tag}"))
    }

    /// Dependencies are derived from `dep_<uuid>` keys.
    pub fn dependencies(&self) -> Vec<Uuid> {
        self.attributes
            .keys()
            .filter_map(|k| k.strip_prefix("dep_"))
            .filter_map(|u| Uuid::parse_str(u).ok())
            .collect()
    }

    pub fn depends_on(&self, other: Uuid) -> bool {
        self.attributes.contains_key(&format!("dep_{other}"))
    }

    /// Annotations are derived from `annotation_<epoch>` keys.
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut out: Vec<Annotation> = self
            .attributes
            .iter()
            .filter_map(|(k, v)| {
                let ts = k.strip_prefix("annotation_")?;
                let secs: i64 = ts.parse().ok()?;
                let entry = Utc.timestamp_opt(secs, 0).single()?;
                Some(Annotation {
                    entry,
                    description: v.clone(),
                })
            })
            .collect();
        out.sort_by_key(|a| a.entry);
        out
    }

    /// `is_active()` ≡ `start` present and `end` absent (§4.2).
    pub fn is_active(&self) -> bool {
        self.attributes.contains_key("start") && !self.attributes.contains_key("end")
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.due(), Ok(Some(due)) if due < now) && matches!(self.status(), Ok(TaskStatus::Pending))
    }
}

pub(crate) fn format_attr_instant(dt: DateTime<Utc>) -> String {
    format_instant(dt)
}
