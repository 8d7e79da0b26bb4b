//! Ignore policies.
//!
//! A policy excludes migrations from analysis before any SQL is generated.
//! What matters for caching is which of its rules hit a given migration, see
//! [`IgnorePolicy::matches`].

use serde::{Deserialize, Serialize};

use crate::migration::MigrationDefinition;

/// Caller-supplied exclusion rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnorePolicy {
    /// Ignore migrations whose name contains this substring.
    pub name_contains: Option<String>,
    /// Ignore these migrations, given as `name`, `app/name` or file path.
    pub names: Vec<String>,
    /// When non-empty, only these apps are linted.
    pub include_apps: Vec<String>,
    /// Never lint these apps.
    pub exclude_apps: Vec<String>,
    /// Ignore migrations without operations.
    pub ignore_noop: bool,
}

/// A policy rule that matched a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum IgnoreReason {
    /// `name_contains` matched.
    NameContains(String),
    /// Listed in `names`.
    Listed(String),
    /// `include_apps` is set and does not list the app.
    NotIncluded,
    /// Listed in `exclude_apps`.
    ExcludedApp(String),
    /// The migration has no operations.
    Noop,
}

impl IgnorePolicy {
    /// Creates an empty policy that ignores nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores migrations whose name contains `pattern`.
    #[must_use]
    pub fn name_contains(mut self, pattern: impl Into<String>) -> Self {
        self.name_contains = Some(pattern.into());
        self
    }

    /// Ignores a migration by name, `app/name` or path.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Lints only `app` (may be called repeatedly).
    #[must_use]
    pub fn include_app(mut self, app: impl Into<String>) -> Self {
        self.include_apps.push(app.into());
        self
    }

    /// Never lints `app`.
    #[must_use]
    pub fn exclude_app(mut self, app: impl Into<String>) -> Self {
        self.exclude_apps.push(app.into());
        self
    }

    /// Ignores migrations without operations.
    #[must_use]
    pub const fn ignore_noop(mut self, enabled: bool) -> Self {
        self.ignore_noop = enabled;
        self
    }

    /// Returns the rules that match `migration`, in declaration order.
    ///
    /// The migration is ignored iff the list is non-empty. Two policies that
    /// produce the same list for a migration are equivalent for it.
    #[must_use]
    pub fn matches(&self, migration: &MigrationDefinition) -> Vec<IgnoreReason> {
        let id = &migration.id;
        let qualified = id.to_string();
        let path = migration
            .path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let mut reasons = Vec::new();

        if let Some(ref pattern) = self.name_contains {
            if id.name.contains(pattern.as_str()) {
                reasons.push(IgnoreReason::NameContains(pattern.clone()));
            }
        }

        reasons.extend(
            self.names
                .iter()
                .filter(|entry| {
                    let entry = entry.as_str();
                    entry == id.name
                        || entry == qualified
                        || path.as_deref().is_some_and(|p| p.ends_with(entry))
                })
                .map(|entry| IgnoreReason::Listed(entry.clone())),
        );

        if !self.include_apps.is_empty() && !self.include_apps.contains(&id.app) {
            reasons.push(IgnoreReason::NotIncluded);
        }

        if self.exclude_apps.contains(&id.app) {
            reasons.push(IgnoreReason::ExcludedApp(id.app.clone()));
        }

        if self.ignore_noop && migration.is_noop() {
            reasons.push(IgnoreReason::Noop);
        }

        reasons
    }

    /// Returns true if the policy ignores `migration`.
    #[must_use]
    pub fn ignores(&self, migration: &MigrationDefinition) -> bool {
        !self.matches(migration).is_empty()
    }
}
