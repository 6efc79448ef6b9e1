//! Urgency computation (§4.2)
//!
//! Urgency is a weighted sum over boolean and scalar terms, computed on
//! demand from task state and a host-supplied coefficient table. It is
//! never stored (§3: "computed, not stored").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::model::{Priority, Task, TaskStatus};

/// Coefficients for each urgency term, read from `Configuration` at call
/// time. The computation itself (`urgency`) is pure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyCoefficients {
    pub priority_high: f64,
    pub priority_medium: f64,
    pub priority_low: f64,
    pub active: f64,
    pub next_tag: f64,
    pub due_near: f64,
    pub scheduled_past: f64,
    pub is_blocking: f64,
    pub is_blocked: f64,
    pub has_project: f64,
    pub has_annotations: f64,
    pub age_per_day: f64,
    pub age_max_days: f64,
}

impl Default for UrgencyCoefficients {
    fn default() -> Self {
        Self {
            priority_high: 6.0,
            priority_medium: 3.9,
            priority_low: 1.8,
            active: 4.0,
            next_tag: 15.0,
            due_near: 12.0,
            scheduled_past: 5.0,
            is_blocking: 8.0,
            is_blocked: -5.0,
            has_project: 1.0,
            has_annotations: 1.0,
            age_per_day: 0.01,
            age_max_days: 365.0,
        }
    }
}

/// Dynamic facts about a task's place in the dependency graph, supplied by
/// the `Replica` since they can't be derived from the task alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrgencyContext {
    pub is_blocking: bool,
    pub is_blocked: bool,
}

/// Compute urgency for `task` as of `now`, using `coef` and `ctx`.
pub fn urgency(task: &Task, coef: &UrgencyCoefficients, ctx: UrgencyContext, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;

    score += match task.priority() {
        Some(Priority::High) => coef.priority_high,
        Some(Priority::Medium) => coef.priority_medium,
        Some(Priority::Low) => coef.priority_low,
        None => 0.0,
    };

    if task.is_active() {
        score += coef.active;
    }

    if task.has_tag("next") {
        score += coef.next_tag;
    }

    if let Ok(Some(due)) = task.due() {
        let days_until = (due - now).num_seconds() as f64 / 86_400.0;
        if days_until <= 7.0 {
            score += coef.due_near;
        }
    }

    if let Ok(Some(scheduled)) = task.scheduled() {
        if scheduled <= now {
            score += coef.scheduled_past;
        }
    }

    if ctx.is_blocking {
        score += coef.is_blocking;
    }
    if ctx.is_blocked {
        score += coef.is_blocked;
    }

    if task.project().is_some() {
        score += coef.has_project;
    }

    if !task.annotations().is_empty() {
        score += coef.has_annotations;
    }

    if let Ok(Some(entry)) = task.entry() {
        if matches!(task.status(), Ok(TaskStatus::Pending)) {
            let age_days = ((now - entry).num_seconds() as f64 / 86_400.0).clamp(0.0, coef.age_max_days);
            score += age_days * coef.age_per_day;
        }
    }

    score
}
