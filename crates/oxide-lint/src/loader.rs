//! Migration discovery.
//!
//! Migrations live in `<dir>/<app>/<name>.toml`:
//!
//! ```toml
//! dependencies = ["users/0001_initial"]
//!
//! [[operations]]
//! op = "add_column"
//! table = "users"
//! column = { name = "age", type = "integer", nullable = false }
//! ```
//!
//! The raw file bytes become the migration's fingerprinted source, so any
//! edit to the file, comments included, invalidates its cached verdict.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{LintError, Result};
use crate::migration::{MigrationDefinition, MigrationId};
use crate::operations::MigrationOperation;

/// Extension of migration files.
pub const MIGRATION_EXTENSION: &str = "toml";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MigrationFile {
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    operations: Vec<MigrationOperation>,
}

/// Parses one migration file.
pub fn load_migration(app: &str, path: &Path) -> Result<MigrationDefinition> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| LintError::ParseError {
            path: path.to_path_buf(),
            message: "file name is not valid UTF-8".to_string(),
        })?;

    let raw = fs::read(path)?;
    let parse_error = |message: String| LintError::ParseError {
        path: path.to_path_buf(),
        message,
    };

    let text = std::str::from_utf8(&raw).map_err(|e| parse_error(e.to_string()))?;
    let file: MigrationFile = toml::from_str(text).map_err(|e| parse_error(e.to_string()))?;

    let mut migration = MigrationDefinition::new(app, name).operations(file.operations);
    for dependency in &file.dependencies {
        let id: MigrationId = dependency.parse().map_err(|e: LintError| parse_error(e.to_string()))?;
        migration = migration.depends_on(id.app, id.name);
    }

    Ok(migration.with_source(path, raw))
}

/// Loads every migration under `dir`, in dependency order.
///
/// Ties are broken by `(app, name)`, so the order is stable across runs and
/// platforms.
pub fn load_migrations(dir: impl AsRef<Path>) -> Result<Vec<MigrationDefinition>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(LintError::MigrationsDirNotFound(dir.to_path_buf()));
    }

    let mut migrations = Vec::new();
    for app_dir in sorted_entries(dir)? {
        if !app_dir.is_dir() {
            continue;
        }
        let Some(app) = app_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        for path in sorted_entries(&app_dir)? {
            if path.is_file()
                && path.extension().is_some_and(|ext| ext == MIGRATION_EXTENSION)
            {
                migrations.push(load_migration(app, &path)?);
            }
        }
    }

    debug!(dir = %dir.display(), count = migrations.len(), "Discovered migrations");
    sort_migrations(migrations)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// Orders migrations so that each comes after its dependencies.
pub fn sort_migrations(migrations: Vec<MigrationDefinition>) -> Result<Vec<MigrationDefinition>> {
    let mut by_id = BTreeMap::new();
    for migration in migrations {
        let id = migration.id.clone();
        if by_id.insert(id.clone(), migration).is_some() {
            return Err(LintError::DuplicateMigration(id.to_string()));
        }
    }

    let mut in_degree: BTreeMap<&MigrationId, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&MigrationId, Vec<&MigrationId>> = BTreeMap::new();

    for (id, migration) in &by_id {
        in_degree.entry(id).or_insert(0);
        for dependency in &migration.dependencies {
            if !by_id.contains_key(dependency) {
                return Err(LintError::MissingDependency {
                    migration: id.to_string(),
                    dependency: dependency.to_string(),
                });
            }
            *in_degree.entry(id).or_insert(0) += 1;
            dependents.entry(dependency).or_default().push(id);
        }
    }

    // Kahn's algorithm, always taking the smallest ready id.
    let mut ready: BTreeSet<&MigrationId> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(by_id.len());

    while let Some(id) = ready.pop_first() {
        order.push(id.clone());
        for dependent in dependents.get(id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() != by_id.len() {
        return Err(LintError::CircularDependency);
    }

    Ok(order
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SqlType;

    fn write(dir: &Path, app: &str, name: &str, content: &str) -> PathBuf {
        let app_dir = dir.join(app);
        fs::create_dir_all(&app_dir).unwrap();
        let path = app_dir.join(format!("{name}.toml"));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_migration_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "users",
            "0002_add_age",
            r#"
dependencies = ["users/0001_initial"]

[[operations]]
op = "add_column"
table = "users"
column = { name = "age", type = "integer", nullable = false }
"#,
        );

        let migration = load_migration("users", &path).unwrap();
        assert_eq!(migration.id, MigrationId::new("users", "0002_add_age"));
        assert_eq!(
            migration.dependencies,
            vec![MigrationId::new("users", "0001_initial")]
        );
        assert_eq!(migration.path.as_deref(), Some(path.as_path()));
        assert_eq!(
            migration.source_bytes().unwrap().as_ref(),
            fs::read(&path).unwrap().as_slice()
        );

        let MigrationOperation::AddColumn { ref column, .. } = migration.operations[0] else {
            panic!("expected add_column, got {:?}", migration.operations[0]);
        };
        assert_eq!(column.sql_type, SqlType::Integer);
        assert!(!column.nullable);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "users", "0001_initial", "operations = 3");
        assert!(matches!(
            load_migration("users", &path),
            Err(LintError::ParseError { path: p, .. }) if p == path
        ));

        let path = write(dir.path(), "users", "0002", "dependencies = [\"no-slash\"]");
        assert!(matches!(
            load_migration("users", &path),
            Err(LintError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_migrations_in_dependency_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "users", "0001_initial", "");
        write(
            dir.path(),
            "books",
            "0001_initial",
            "dependencies = [\"users/0002_profile\"]",
        );
        write(
            dir.path(),
            "users",
            "0002_profile",
            "dependencies = [\"users/0001_initial\"]",
        );
        fs::write(dir.path().join("users").join("README.md"), "not a migration").unwrap();

        let ids: Vec<String> = load_migrations(dir.path())
            .unwrap()
            .iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec!["users/0001_initial", "users/0002_profile", "books/0001_initial"]
        );
    }

    #[test]
    fn test_independent_migrations_sorted_by_id() {
        let sorted = sort_migrations(vec![
            MigrationDefinition::new("users", "0001"),
            MigrationDefinition::new("books", "0001"),
            MigrationDefinition::new("authors", "0001"),
        ])
        .unwrap();
        let apps: Vec<&str> = sorted.iter().map(|m| m.id.app.as_str()).collect();
        assert_eq!(apps, vec!["authors", "books", "users"]);
    }

    #[test]
    fn test_missing_dir() {
        assert!(matches!(
            load_migrations("/nonexistent/migrations"),
            Err(LintError::MigrationsDirNotFound(_))
        ));
    }

    #[test]
    fn test_dependency_errors() {
        let missing = sort_migrations(vec![
            MigrationDefinition::new("users", "0002").depends_on("users", "0001"),
        ]);
        assert!(matches!(
            missing,
            Err(LintError::MissingDependency { ref migration, ref dependency })
                if migration == "users/0002" && dependency == "users/0001"
        ));

        let circular = sort_migrations(vec![
            MigrationDefinition::new("a", "0001").depends_on("b", "0001"),
            MigrationDefinition::new("b", "0001").depends_on("a", "0001"),
        ]);
        assert!(matches!(circular, Err(LintError::CircularDependency)));

        let duplicate = sort_migrations(vec![
            MigrationDefinition::new("a", "0001"),
            MigrationDefinition::new("a", "0001"),
        ]);
        assert!(matches!(duplicate, Err(LintError::DuplicateMigration(ref id)) if id == "a/0001"));
    }
}
