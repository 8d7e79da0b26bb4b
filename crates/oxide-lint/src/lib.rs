//! Backward-compatibility linter for Django-like database migrations.
//!
//! `oxide-lint` renders each migration of a history into the SQL it would
//! run, then flags the statements that break code still running against the
//! previous schema:
//! - Renaming or dropping tables and columns
//! - Adding NOT NULL columns without a default
//! - Altering column types or constraints
//!
//! Verdicts are memoized per migration in a content-addressed cache, so a
//! second run over an unchanged history generates no SQL at all.
//!
//! # Architecture
//!
//! - **Loader** - Reads `<app>/<name>.toml` migration files in dependency order
//! - **Dialect** - Renders operations as SQLite, PostgreSQL or MySQL statements
//! - **Source** - Turns migrations into statements, in process or in a SQLite sandbox
//! - **Rules / Analyzer** - Classifies statements and derives OK/ERR/IGNORE
//! - **Cache** - Persists verdicts keyed by migration content and lint context
//! - **Linter** - Drives a run and aggregates the report
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_lint::prelude::*;
//!
//! let migrations = load_migrations("migrations")?;
//! let cache = CacheStore::open(default_cache_dir(), "shop_postgres");
//!
//! let mut linter = MigrationLinter::new(GeneratedSource::new(PostgresDialect::new()))
//!     .with_cache(cache)
//!     .with_policy(IgnorePolicy::new().name_contains("squashed"));
//!
//! let report = linter.lint(&migrations).await?;
//! for migration in &report.migrations {
//!     println!("{migration}");
//! }
//! println!("{}", report.summary());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Lint every migration under ./migrations for PostgreSQL
//! oxide-lint lint --dialect postgres
//!
//! # Show the SQL of one migration
//! oxide-lint sqlmigrate --app users --migration 0002_add_age
//!
//! # Forget every cached verdict
//! oxide-lint clear-cache
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod dialect;
pub mod error;
pub mod fingerprint;
pub mod linter;
pub mod loader;
pub mod migration;
pub mod operations;
pub mod policy;
pub mod rules;
pub mod sandbox;
pub mod schema;
pub mod source;
pub mod state;
pub mod statement;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::analyzer::{Analysis, Analyzer, Verdict, analyze};
    pub use crate::cache::{CacheEntry, CacheKey, CacheStore, store_name};
    pub use crate::config::{LintConfig, default_cache_dir};
    pub use crate::dialect::{
        Dialect, MigrationDialect, MysqlDialect, PostgresDialect, SqliteDialect, generator_for,
    };
    pub use crate::error::{GenerationError, LintError, Result};
    pub use crate::linter::{LintReport, MigrationLinter, MigrationReport, Outcome, sql_for};
    pub use crate::loader::{load_migration, load_migrations};
    pub use crate::migration::{MigrationDefinition, MigrationId};
    pub use crate::operations::{ColumnChanges, MigrationOperation};
    pub use crate::policy::{IgnorePolicy, IgnoreReason};
    pub use crate::rules::{Diagnostic, IssueCode, NotNullPolicy, Rule, RuleCatalog};
    pub use crate::sandbox::SqliteSandbox;
    pub use crate::schema::{
        ColumnSchema, DatabaseSchema, DefaultValue, ForeignKeyAction, ForeignKeySchema,
        IndexSchema, SqlType, TableSchema,
    };
    pub use crate::source::{GeneratedSource, StatementSource};
    pub use crate::state::SchemaState;
}
