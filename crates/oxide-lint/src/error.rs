//! Error types for the migration linter.

use std::path::PathBuf;

/// Errors that can occur while discovering, linting or caching migrations.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// A migration has a circular dependency.
    #[error("Circular dependency detected in migrations")]
    CircularDependency,

    /// A migration depends on another that doesn't exist.
    #[error("Migration '{migration}' depends on '{dependency}' which doesn't exist")]
    MissingDependency {
        /// The migration with the missing dependency.
        migration: String,
        /// The dependency that's missing.
        dependency: String,
    },

    /// Two migration files resolve to the same identity.
    #[error("Duplicate migration: {0}")]
    DuplicateMigration(String),

    /// IO error (reading migration files, persisting the cache).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse migration file.
    #[error("Failed to parse migration file '{path}': {message}")]
    ParseError {
        /// Path to the migration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// No migrations directory found.
    #[error("Migrations directory not found: {0}")]
    MigrationsDirNotFound(PathBuf),

    /// Migration not found.
    #[error("Migration not found: {app}/{name}")]
    MigrationNotFound {
        /// Application name.
        app: String,
        /// Migration name.
        name: String,
    },

    /// A migration reference is not of the form `app/name`.
    #[error("Invalid migration reference '{0}', expected app/name")]
    InvalidMigrationId(String),

    /// An operation does not fit the schema built so far.
    #[error("Invalid migration state: {0}")]
    InvalidState(String),

    /// The requested dialect is not known.
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// No usable directory for the cache could be determined.
    #[error("Cache directory unavailable: {0}")]
    CacheDirUnavailable(String),

    /// Statement generation failed outside of a lint run.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("Config error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type for linter operations.
pub type Result<T> = std::result::Result<T, LintError>;

/// Failure of a statement source to materialize a migration's SQL.
///
/// These are never cached: a failed generation must be retried on the next run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The source cannot produce statements for this dialect.
    #[error("Dialect '{0}' is not supported by this statement source")]
    UnsupportedDialect(String),

    /// The migration does not apply to the schema built by earlier migrations.
    #[error("Invalid migration {migration}: {message}")]
    InvalidMigration {
        /// Migration identifier (`app/name`).
        migration: String,
        /// What went wrong.
        message: String,
    },

    /// The throwaway database rejected a generated statement.
    #[error("Statement rejected for {migration}: {message}\n  {sql}")]
    Rejected {
        /// Migration identifier (`app/name`).
        migration: String,
        /// The rejected statement.
        sql: String,
        /// Engine error message.
        message: String,
    },
}

/// A statement that could not be tokenized or parsed.
///
/// The analyzer treats such statements as matching no rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    /// A quoted identifier or string literal was never closed.
    #[error("Unterminated {what} starting at byte {offset}")]
    Unterminated {
        /// "string literal" or "quoted identifier".
        what: &'static str,
        /// Byte offset of the opening quote.
        offset: usize,
    },

    /// The statement ended where more tokens were expected.
    #[error("Unexpected end of statement, expected {0}")]
    UnexpectedEnd(&'static str),

    /// A token did not fit the recognized grammar.
    #[error("Unexpected token '{found}', expected {expected}")]
    Unexpected {
        /// The token text.
        found: String,
        /// What the parser wanted.
        expected: &'static str,
    },
}
