//! In-memory SQLite sandbox.
//!
//! Generates statements with [`SqliteDialect`] and runs them against a
//! throwaway in-memory database, so a migration that SQLite itself would
//! refuse fails its lint instead of passing silently.

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{debug, warn};

use crate::dialect::{Dialect, SqliteDialect};
use crate::error::GenerationError;
use crate::migration::{MigrationDefinition, MigrationId};
use crate::source::{GeneratedSource, Plan, StatementSource};
use crate::statement::{Statement, StatementKind};

/// A [`StatementSource`] backed by an in-memory SQLite database.
///
/// The database is created on the first [`generate`](StatementSource::generate).
/// Skipped migrations are queued and replayed right before the next
/// generation, so a run served entirely from cache never opens a connection.
/// The tracked schema only advances once a migration has run in the
/// database, so the two never drift apart.
pub struct SqliteSandbox {
    generator: GeneratedSource<SqliteDialect>,
    pool: Option<SqlitePool>,
    pending: Vec<MigrationDefinition>,
}

impl SqliteSandbox {
    /// Creates an empty sandbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generator: GeneratedSource::new(SqliteDialect::new()),
            pool: None,
            pending: Vec::new(),
        }
    }

    /// Creates a sandbox for `dialect`, which must be SQLite.
    pub fn for_dialect(dialect: Dialect) -> Result<Self, GenerationError> {
        match dialect {
            Dialect::Sqlite => Ok(Self::new()),
            other => Err(GenerationError::UnsupportedDialect(other.to_string())),
        }
    }

    /// Returns the number of skipped migrations awaiting replay.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Returns true once the database has been created.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn pool(&mut self, migration: &MigrationId) -> Result<SqlitePool, GenerationError> {
        if let Some(ref pool) = self.pool {
            return Ok(pool.clone());
        }

        // One connection that never expires: the database lives as long as it does.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(":memory:")
            .await
            .map_err(|e| GenerationError::Rejected {
                migration: migration.to_string(),
                sql: String::new(),
                message: format!("cannot open sandbox database: {e}"),
            })?;
        debug!("Opened sandbox database");

        self.pool = Some(pool.clone());
        Ok(pool)
    }

    /// Runs the queued migrations. A migration that cannot be replayed is
    /// left out of the tracked schema; it never fails the migration being
    /// generated.
    async fn replay_pending(&mut self, pool: &SqlitePool) {
        for migration in std::mem::take(&mut self.pending) {
            debug!(migration = %migration.id, "Replaying skipped migration");
            let replayed = match self.generator.plan(&migration) {
                Ok(Plan { statements, state }) => execute(pool, &migration.id, &statements)
                    .await
                    .map(|()| state),
                Err(e) => Err(e),
            };
            match replayed {
                Ok(state) => self.generator.commit(state),
                Err(e) => {
                    warn!(migration = %migration.id, error = %e, "Cannot replay skipped migration");
                }
            }
        }
    }
}

impl Default for SqliteSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementSource for SqliteSandbox {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn generate(
        &mut self,
        migration: &MigrationDefinition,
    ) -> Result<Vec<String>, GenerationError> {
        let pool = self.pool(&migration.id).await?;
        self.replay_pending(&pool).await;

        let Plan { statements, state } = self.generator.plan(migration)?;
        execute(&pool, &migration.id, &statements).await?;
        self.generator.commit(state);

        Ok(statements)
    }

    fn skip(&mut self, migration: &MigrationDefinition) {
        self.pending.push(migration.clone());
    }
}

/// Runs one migration's statements in a single transaction.
async fn execute(
    pool: &SqlitePool,
    migration: &MigrationId,
    statements: &[String],
) -> Result<(), GenerationError> {
    let rejected = |sql: &str, e: sqlx::Error| GenerationError::Rejected {
        migration: migration.to_string(),
        sql: sql.to_string(),
        message: e.to_string(),
    };

    let mut tx = pool.begin().await.map_err(|e| rejected("BEGIN", e))?;

    for sql in statements {
        if is_comment(sql) {
            debug!(comment = %sql, "Skipping comment");
            continue;
        }
        if let Err(e) = sqlx::query(sql).execute(&mut *tx).await {
            if let Err(rollback) = tx.rollback().await {
                warn!(migration = %migration, error = %rollback, "Rollback failed");
            }
            return Err(rejected(sql, e));
        }
    }

    tx.commit().await.map_err(|e| rejected("COMMIT", e))
}

fn is_comment(sql: &str) -> bool {
    matches!(
        Statement::parse(sql),
        Ok(Statement {
            kind: StatementKind::Comment { .. },
            ..
        })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{ColumnChanges, MigrationOperation};
    use crate::schema::{ColumnSchema, DefaultValue, ForeignKeyAction, ForeignKeySchema, SqlType};

    fn initial() -> MigrationDefinition {
        MigrationDefinition::new("users", "0001_initial").operation(
            MigrationOperation::create_table(
                "users",
                vec![
                    ColumnSchema::new("id", SqlType::Integer)
                        .primary_key()
                        .auto_increment(),
                    ColumnSchema::new("name", SqlType::Varchar(100)).not_null(),
                ],
            ),
        )
    }

    fn make_name_nullable() -> MigrationDefinition {
        MigrationDefinition::new("users", "0002_nullable_name")
            .depends_on("users", "0001_initial")
            .operation(MigrationOperation::alter_column(
                "users",
                "name",
                ColumnChanges::new().set_nullable(true),
            ))
    }

    #[tokio::test]
    async fn test_generate_executes_statements() {
        let mut sandbox = SqliteSandbox::new();
        assert!(!sandbox.is_connected());

        sandbox.generate(&initial()).await.unwrap();
        let sql = sandbox.generate(&make_name_nullable()).await.unwrap();

        assert!(sandbox.is_connected());
        assert_eq!(sql.len(), 4);
        assert!(sql[0].starts_with("CREATE TABLE \"new__users\""));
    }

    #[tokio::test]
    async fn test_skip_is_replayed_lazily() {
        let mut sandbox = SqliteSandbox::new();
        sandbox.skip(&initial());

        assert_eq!(sandbox.pending(), 1);
        assert!(!sandbox.is_connected());

        sandbox.generate(&make_name_nullable()).await.unwrap();
        assert_eq!(sandbox.pending(), 0);
    }

    fn seed_row() -> MigrationDefinition {
        MigrationDefinition::new("users", "0002_seed")
            .operation(MigrationOperation::run_sql("INSERT INTO users (name) VALUES ('alice')"))
    }

    fn add_age() -> MigrationDefinition {
        MigrationDefinition::new("users", "0003_add_age").operation(
            MigrationOperation::add_column(
                "users",
                ColumnSchema::new("age", SqlType::Integer).not_null(),
            ),
        )
    }

    fn add_email() -> MigrationDefinition {
        MigrationDefinition::new("users", "0004_add_email").operation(
            MigrationOperation::add_column("users", ColumnSchema::new("email", SqlType::Text)),
        )
    }

    #[tokio::test]
    async fn test_engine_rejection() {
        let mut sandbox = SqliteSandbox::new();
        sandbox.generate(&initial()).await.unwrap();
        sandbox.generate(&seed_row()).await.unwrap();

        // SQLite refuses a NOT NULL column without a default once the table has rows.
        let err = sandbox.generate(&add_age()).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Rejected { ref migration, ref sql, .. }
                if migration == "users/0003_add_age" && sql.contains("ADD COLUMN")
        ));

        // The rejected migration left no trace.
        let with_default = MigrationDefinition::new("users", "0003_add_age").operation(
            MigrationOperation::add_column(
                "users",
                ColumnSchema::new("age", SqlType::Integer)
                    .not_null()
                    .default(DefaultValue::Integer(0)),
            ),
        );
        sandbox.generate(&with_default).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_replay_does_not_fail_next_migration() {
        let mut sandbox = SqliteSandbox::new();
        sandbox.generate(&initial()).await.unwrap();
        sandbox.generate(&seed_row()).await.unwrap();

        sandbox.skip(&add_age());
        assert_eq!(sandbox.pending(), 1);

        let sql = sandbox.generate(&add_email()).await.unwrap();
        assert!(sql[0].contains("ADD COLUMN \"email\""));
        assert_eq!(sandbox.pending(), 0);

        let users = sandbox.generator.state().schema().get_table("users").unwrap();
        assert!(users.get_column("age").is_none());
        assert!(users.get_column("email").is_some());
    }

    #[tokio::test]
    async fn test_comments_are_not_executed() {
        let mut sandbox = SqliteSandbox::new();
        sandbox.generate(&initial()).await.unwrap();

        let add_fk = MigrationDefinition::new("users", "0002_fk").operation(
            MigrationOperation::AddForeignKey {
                table: "users".to_string(),
                foreign_key: ForeignKeySchema {
                    name: "users_self_fk".to_string(),
                    columns: vec!["id".to_string()],
                    references_table: "users".to_string(),
                    references_columns: vec!["id".to_string()],
                    on_delete: ForeignKeyAction::Cascade,
                },
            },
        );
        let sql = sandbox.generate(&add_fk).await.unwrap();
        assert!(sql[0].starts_with("-- "));
    }

    #[tokio::test]
    async fn test_invalid_migration_never_reaches_database() {
        let mut sandbox = SqliteSandbox::new();
        let err = sandbox.generate(&make_name_nullable()).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidMigration { .. }));
    }

    #[test]
    fn test_for_dialect() {
        assert!(SqliteSandbox::for_dialect(Dialect::Sqlite).is_ok());
        assert_eq!(
            SqliteSandbox::for_dialect(Dialect::Postgres).err(),
            Some(GenerationError::UnsupportedDialect("postgres".to_string()))
        );
    }
}
