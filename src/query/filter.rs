//! Tag set-membership filter, the only compound predicate `TaskFilter`
//! supports beyond plain equality.

/// Require/forbid specific tags, matched against a task's derived tag
/// list (§3's `tag_<name>` keys).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TagFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_tags(tags: Vec<String>) -> Self {
        Self { include: tags, exclude: Vec::new() }
    }

    pub fn exclude_tags(tags: Vec<String>) -> Self {
        Self { include: Vec::new(), exclude: tags }
    }

    pub fn matches(&self, task_tags: &[&str]) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|tag| task_tags.contains(&tag.as_str())) {
            return false;
        }
        if self.exclude.iter().any(|tag| task_tags.contains(&tag.as_str())) {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}
