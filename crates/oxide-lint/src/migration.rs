//! Migration identities and definitions.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LintError, Result};
use crate::operations::MigrationOperation;

/// Identity of a migration: owning app and migration name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MigrationId {
    /// Application/module name.
    pub app: String,
    /// Migration name.
    pub name: String,
}

impl MigrationId {
    /// Creates a new migration identity.
    #[must_use]
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app, self.name)
    }
}

impl FromStr for MigrationId {
    type Err = LintError;

    /// Parses `app/name`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((app, name)) if !app.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(app, name))
            }
            _ => Err(LintError::InvalidMigrationId(s.to_string())),
        }
    }
}

/// Canonical serialized form of a migration built in code.
#[derive(Serialize)]
struct CanonicalDefinition<'a> {
    app: &'a str,
    name: &'a str,
    dependencies: &'a [MigrationId],
    operations: &'a [MigrationOperation],
}

/// A migration as discovered: identity, dependencies and operations.
#[derive(Debug, Clone)]
pub struct MigrationDefinition {
    /// Migration identity.
    pub id: MigrationId,
    /// Migrations that must run before this one.
    pub dependencies: Vec<MigrationId>,
    /// Operations, in order.
    pub operations: Vec<MigrationOperation>,
    /// File the migration was loaded from, if any.
    pub path: Option<PathBuf>,
    /// Raw file contents, if loaded from disk.
    source: Option<Vec<u8>>,
}

impl MigrationDefinition {
    /// Creates an empty migration.
    #[must_use]
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: MigrationId::new(app, name),
            dependencies: Vec::new(),
            operations: Vec::new(),
            path: None,
            source: None,
        }
    }

    /// Adds an operation to this migration.
    #[must_use]
    pub fn operation(mut self, op: MigrationOperation) -> Self {
        self.operations.push(op);
        self.source = None;
        self
    }

    /// Adds operations to this migration.
    #[must_use]
    pub fn operations(mut self, ops: Vec<MigrationOperation>) -> Self {
        self.operations.extend(ops);
        self.source = None;
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn depends_on(mut self, app: impl Into<String>, name: impl Into<String>) -> Self {
        self.dependencies.push(MigrationId::new(app, name));
        self.source = None;
        self
    }

    /// Attaches the file this migration was parsed from.
    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>, raw: impl Into<Vec<u8>>) -> Self {
        self.path = Some(path.into());
        self.source = Some(raw.into());
        self
    }

    /// Returns the bytes the content fingerprint covers.
    ///
    /// Loaded migrations use their raw file contents, so comment or formatting
    /// edits count as changes. Migrations built in code use canonical JSON.
    pub fn source_bytes(&self) -> Result<Cow<'_, [u8]>> {
        if let Some(ref raw) = self.source {
            return Ok(Cow::Borrowed(raw));
        }
        let canonical = CanonicalDefinition {
            app: &self.id.app,
            name: &self.id.name,
            dependencies: &self.dependencies,
            operations: &self.operations,
        };
        Ok(Cow::Owned(serde_json::to_vec(&canonical)?))
    }

    /// Returns true if the migration has no operations.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSchema, SqlType};

    #[test]
    fn test_id_display_and_parse() {
        let id: MigrationId = "users/0001_initial".parse().unwrap();
        assert_eq!(id, MigrationId::new("users", "0001_initial"));
        assert_eq!(id.to_string(), "users/0001_initial");
        assert!("0001_initial".parse::<MigrationId>().is_err());
        assert!("a/b/c".parse::<MigrationId>().is_err());
    }

    #[test]
    fn test_id_ordering() {
        let mut ids = vec![
            MigrationId::new("users", "0002"),
            MigrationId::new("books", "0001"),
            MigrationId::new("users", "0001"),
        ];
        ids.sort();
        assert_eq!(ids[0], MigrationId::new("books", "0001"));
        assert_eq!(ids[2], MigrationId::new("users", "0002"));
    }

    #[test]
    fn test_source_bytes_prefers_raw_file() {
        let migration = MigrationDefinition::new("users", "0001")
            .operation(MigrationOperation::drop_table("old"))
            .with_source("migrations/users/0001.toml", b"# raw".to_vec());
        assert_eq!(migration.source_bytes().unwrap().as_ref(), b"# raw");
    }

    #[test]
    fn test_canonical_source_tracks_operations() {
        let base = MigrationDefinition::new("users", "0002");
        let changed = base.clone().operation(MigrationOperation::add_column(
            "users",
            ColumnSchema::new("age", SqlType::Integer),
        ));

        assert_ne!(
            base.source_bytes().unwrap(),
            changed.source_bytes().unwrap()
        );
        assert_eq!(
            changed.source_bytes().unwrap(),
            changed.clone().source_bytes().unwrap()
        );
        assert!(base.is_noop());
        assert!(!changed.is_noop());
    }
}
