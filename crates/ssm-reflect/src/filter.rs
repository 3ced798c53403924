//! Include/exclude filters over local field paths
//!
//! The longest rule whose path is a prefix of the field path decides. When
//! two rules of equal length match, the one declared first decides. An empty
//! rule set includes every field.

use std::fmt;

/// Whether a rule includes or excludes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterAction {
    /// Keep matching fields
    Include,
    /// Drop matching fields
    Exclude,
}

/// One prefix rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldFilter {
    path: String,
    action: FilterAction,
}

impl FieldFilter {
    /// Dotted path prefix the rule applies to
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Rule action
    #[inline]
    #[must_use]
    pub fn action(&self) -> FilterAction {
        self.action
    }
}

/// Ordered rule set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilters {
    rules: Vec<FieldFilter>,
}

impl FieldFilters {
    /// Empty rule set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Rule set from include and exclude lists; includes are declared first
    #[must_use]
    pub fn from_lists<I, E>(includes: I, excludes: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let mut filters = Self::new();
        for path in includes {
            filters = filters.include(path);
        }
        for path in excludes {
            filters = filters.exclude(path);
        }
        filters
    }

    /// Add an include rule; empty paths are ignored
    #[must_use]
    pub fn include(self, path: impl Into<String>) -> Self {
        self.push(path.into(), FilterAction::Include)
    }

    /// Add an exclude rule; empty paths are ignored
    #[must_use]
    pub fn exclude(self, path: impl Into<String>) -> Self {
        self.push(path.into(), FilterAction::Exclude)
    }

    fn push(mut self, path: String, action: FilterAction) -> Self {
        if !path.is_empty() {
            self.rules.push(FieldFilter { path, action });
        }
        self
    }

    /// Paths of the include rules
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.paths(FilterAction::Include)
    }

    /// Paths of the exclude rules
    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.paths(FilterAction::Exclude)
    }

    fn paths(&self, action: FilterAction) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .filter(move |r| r.action == action)
            .map(FieldFilter::path)
    }

    /// All rules in declaration order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[FieldFilter] {
        &self.rules
    }

    /// Whether no rule is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether the field at `local_path` passes the filter
    #[must_use]
    pub fn is_included(&self, local_path: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }

        let mut longest = 0;
        let mut included = true;
        for rule in &self.rules {
            if local_path.starts_with(rule.path.as_str()) && rule.path.len() > longest {
                longest = rule.path.len();
                included = rule.action == FilterAction::Include;
            }
        }
        included
    }
}

impl fmt::Display for FieldFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .rules
            .iter()
            .map(|r| match r.action {
                FilterAction::Include => format!("+{}", r.path),
                FilterAction::Exclude => format!("-{}", r.path),
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}
