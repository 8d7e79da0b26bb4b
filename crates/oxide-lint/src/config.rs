//! Linter configuration.
//!
//! Settings come from an optional `oxide-lint.toml`; command-line flags
//! override them field by field. Every field is optional in the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheStore, store_name};
use crate::dialect::Dialect;
use crate::error::{LintError, Result};
use crate::policy::IgnorePolicy;
use crate::rules::{NotNullPolicy, RuleCatalog};

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "oxide-lint.toml";

/// Migrations directory used when none is configured.
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Cache directory used when the platform has no user cache directory.
pub const FALLBACK_CACHE_DIR: &str = ".oxide-lint-cache";

/// Settings for one lint run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Root of the `<app>/<name>.toml` tree.
    pub migrations_dir: Option<PathBuf>,
    /// Target dialect; SQLite when unset.
    pub dialect: Option<Dialect>,
    /// Where cache stores are kept.
    pub cache_dir: Option<PathBuf>,
    /// Explicit store name, replacing the per-project default.
    pub cache_name: Option<String>,
    /// Neither read nor write the cache.
    pub no_cache: bool,
    /// Run generated SQL against an in-memory SQLite database.
    pub sandbox: bool,
    /// Migrations to leave out.
    pub ignore: IgnorePolicy,
    /// Statements searched for a default after a NOT NULL column is added.
    /// Unset searches the rest of the migration.
    pub not_null_lookahead: Option<usize>,
}

impl LintConfig {
    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = toml::from_str(&text)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Reads `explicit` if given, else [`CONFIG_FILE`] if present, else
    /// returns the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).is_file() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Returns the migrations directory.
    #[must_use]
    pub fn migrations_dir(&self) -> PathBuf {
        self.migrations_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MIGRATIONS_DIR))
    }

    /// Returns the target dialect.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect.unwrap_or(Dialect::Sqlite)
    }

    /// Returns the cache directory.
    ///
    /// Fails if the configured path exists but is not a directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let dir = self.cache_dir.clone().unwrap_or_else(default_cache_dir);
        if dir.exists() && !dir.is_dir() {
            return Err(LintError::CacheDirUnavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(dir)
    }

    /// Returns the store name: the configured one, or one derived from the
    /// migrations directory and the dialect.
    #[must_use]
    pub fn cache_name(&self) -> String {
        if let Some(ref name) = self.cache_name {
            return name.clone();
        }
        let dir = self.migrations_dir();
        let scope = fs::canonicalize(&dir).unwrap_or(dir);
        store_name(&scope.to_string_lossy(), self.dialect())
    }

    /// Opens the configured store, or `None` when caching is off.
    pub fn cache_store(&self) -> Result<Option<CacheStore>> {
        if self.no_cache {
            return Ok(None);
        }
        Ok(Some(CacheStore::open(self.cache_dir()?, self.cache_name())))
    }

    /// Returns the rule catalog.
    #[must_use]
    pub fn catalog(&self) -> RuleCatalog {
        let policy = self
            .not_null_lookahead
            .map_or_else(NotNullPolicy::rest_of_migration, NotNullPolicy::within);
        RuleCatalog::new().with_not_null_policy(policy)
    }
}

/// Returns the platform cache directory for the linter.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from(FALLBACK_CACHE_DIR),
        |dir| dir.join("oxide-lint"),
    )
}
