//! Statement sources.
//!
//! A statement source turns a migration into the SQL it would run. The linter
//! drives one source through a whole migration history in order: cached
//! migrations are passed to [`StatementSource::skip`] so the source's notion
//! of the current schema stays in step, the rest to
//! [`StatementSource::generate`].

use tracing::{debug, warn};

use crate::dialect::{Dialect, MigrationDialect, generator_for};
use crate::error::GenerationError;
use crate::migration::MigrationDefinition;
use crate::state::SchemaState;

/// Produces the statements of migrations, one migration at a time.
#[allow(async_fn_in_trait)]
pub trait StatementSource {
    /// Returns the dialect the statements are written in.
    fn dialect(&self) -> Dialect;

    /// Returns the statements of `migration`, applied on top of every
    /// migration generated or skipped before it.
    async fn generate(
        &mut self,
        migration: &MigrationDefinition,
    ) -> Result<Vec<String>, GenerationError>;

    /// Accounts for `migration` without producing its statements.
    fn skip(&mut self, migration: &MigrationDefinition);
}

/// Schema state after a migration, with the statements that produce it.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Statements, in order.
    pub statements: Vec<String>,
    /// State once the statements have run.
    pub state: SchemaState,
}

/// Generates statements in process from the tracked schema.
pub struct GeneratedSource<D: MigrationDialect + ?Sized> {
    state: SchemaState,
    dialect: Box<D>,
}

impl<D: MigrationDialect> GeneratedSource<D> {
    /// Creates a source for `dialect` starting from an empty schema.
    #[must_use]
    pub fn new(dialect: D) -> Self {
        Self {
            state: SchemaState::new(),
            dialect: Box::new(dialect),
        }
    }
}

impl GeneratedSource<dyn MigrationDialect> {
    /// Creates a source for a dialect chosen at runtime.
    #[must_use]
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            state: SchemaState::new(),
            dialect: generator_for(dialect),
        }
    }
}

impl<D: MigrationDialect + ?Sized> GeneratedSource<D> {
    /// Returns the schema built so far.
    #[must_use]
    pub fn state(&self) -> &SchemaState {
        &self.state
    }

    /// Plans `migration` against the current state without committing it.
    pub fn plan(&self, migration: &MigrationDefinition) -> Result<Plan, GenerationError> {
        let invalid = |e: crate::error::LintError| GenerationError::InvalidMigration {
            migration: migration.id.to_string(),
            message: e.to_string(),
        };

        let mut state = self.state.clone();
        let mut statements = Vec::new();
        for operation in &migration.operations {
            debug!(migration = %migration.id, operation = %operation.description(), "Planning");
            statements.extend(
                self.dialect
                    .generate_sql(operation, state.schema())
                    .map_err(invalid)?,
            );
            state.apply_operation(operation).map_err(invalid)?;
        }

        Ok(Plan { statements, state })
    }

    /// Makes `state` the current schema.
    pub fn commit(&mut self, state: SchemaState) {
        self.state = state;
    }

    /// Plans and commits `migration`, returning its statements.
    pub fn advance(&mut self, migration: &MigrationDefinition) -> Result<Vec<String>, GenerationError> {
        let Plan { statements, state } = self.plan(migration)?;
        self.commit(state);
        Ok(statements)
    }
}

impl<D: MigrationDialect + ?Sized> StatementSource for GeneratedSource<D> {
    fn dialect(&self) -> Dialect {
        self.dialect.dialect()
    }

    async fn generate(
        &mut self,
        migration: &MigrationDefinition,
    ) -> Result<Vec<String>, GenerationError> {
        let statements = self.advance(migration)?;
        debug!(
            migration = %migration.id,
            statements = statements.len(),
            "Generated statements"
        );
        Ok(statements)
    }

    fn skip(&mut self, migration: &MigrationDefinition) {
        if let Err(e) = self.advance(migration) {
            warn!(migration = %migration.id, error = %e, "Cannot replay skipped migration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use crate::operations::{ColumnChanges, MigrationOperation};
    use crate::schema::{ColumnSchema, DefaultValue, SqlType};

    fn initial() -> MigrationDefinition {
        MigrationDefinition::new("users", "0001_initial").operation(
            MigrationOperation::create_table(
                "users",
                vec![ColumnSchema::new("id", SqlType::Integer).primary_key()],
            ),
        )
    }

    fn add_age() -> MigrationDefinition {
        MigrationDefinition::new("users", "0002_add_age")
            .depends_on("users", "0001_initial")
            .operation(MigrationOperation::add_column(
                "users",
                ColumnSchema::new("age", SqlType::Integer).not_null(),
            ))
            .operation(MigrationOperation::alter_column(
                "users",
                "age",
                ColumnChanges::new().set_default(DefaultValue::Integer(0)),
            ))
    }

    #[tokio::test]
    async fn test_generate_tracks_state() {
        let mut source = GeneratedSource::new(PostgresDialect::new());
        source.generate(&initial()).await.unwrap();
        let sql = source.generate(&add_age()).await.unwrap();

        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"users\" ADD COLUMN \"age\" INTEGER NOT NULL",
                "ALTER TABLE \"users\" ALTER COLUMN \"age\" SET DEFAULT 0",
            ]
        );
        let users = source.state().schema().get_table("users").unwrap();
        assert_eq!(
            users.get_column("age").unwrap().default,
            Some(DefaultValue::Integer(0))
        );
    }

    #[tokio::test]
    async fn test_skip_keeps_state_in_step() {
        let mut source = GeneratedSource::new(SqliteDialect::new());
        source.skip(&initial());

        let sql = source.generate(&add_age()).await.unwrap();
        assert!(sql[1].starts_with("CREATE TABLE \"new__users\""));
    }

    #[tokio::test]
    async fn test_unknown_table_is_invalid_migration() {
        let mut source = GeneratedSource::for_dialect(Dialect::Mysql);
        let err = source.generate(&add_age()).await.unwrap_err();

        assert_eq!(
            err,
            GenerationError::InvalidMigration {
                migration: "users/0002_add_age".to_string(),
                message: "Invalid migration state: Table 'users' does not exist".to_string(),
            }
        );
        assert!(source.state().schema().tables.is_empty());
    }

    #[test]
    fn test_plan_does_not_commit() {
        let source = GeneratedSource::new(PostgresDialect::new());
        let plan = source.plan(&initial()).unwrap();

        assert_eq!(plan.statements.len(), 1);
        assert!(plan.state.schema().get_table("users").is_some());
        assert!(source.state().schema().tables.is_empty());
        assert_eq!(source.dialect(), Dialect::Postgres);
    }
}
