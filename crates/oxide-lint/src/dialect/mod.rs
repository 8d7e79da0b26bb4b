//! Database dialect implementations.
//!
//! Each dialect knows how to render migration operations as the SQL that
//! database would run. The linter never executes this SQL against a real
//! database; it only inspects it (or replays it in a throwaway sandbox).

mod mysql;
mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::{REBUILD_PREFIX, SqliteDialect};

use crate::error::{LintError, Result};
use crate::operations::{ColumnChanges, MigrationOperation};
use crate::schema::{ColumnSchema, DatabaseSchema, ForeignKeySchema, TableSchema};
use crate::statement::split_statements;

/// Marker emitted for [`MigrationOperation::IgnoreMigration`].
pub const IGNORE_MIGRATION_SQL: &str = "-- oxide-lint: ignore migration";

/// Target database flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite 3.35+.
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    Mysql,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Self; 3] = [Self::Sqlite, Self::Postgres, Self::Mysql];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = LintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            _ => Err(LintError::UnsupportedDialect(s.to_string())),
        }
    }
}

/// Looks up a table in the tracked schema.
pub(crate) fn existing_table<'a>(schema: &'a DatabaseSchema, name: &str) -> Result<&'a TableSchema> {
    schema
        .get_table(name)
        .ok_or_else(|| LintError::InvalidState(format!("Table '{name}' does not exist")))
}

/// Looks up a column in the tracked schema.
pub(crate) fn existing_column<'a>(
    schema: &'a DatabaseSchema,
    table: &str,
    column: &str,
) -> Result<&'a ColumnSchema> {
    existing_table(schema, table)?.get_column(column).ok_or_else(|| {
        LintError::InvalidState(format!(
            "Column '{column}' does not exist in table '{table}'"
        ))
    })
}

/// Trait for database-specific SQL generation.
///
/// `schema` is the state built by all earlier operations; dialects that must
/// restate a full table or column definition read it from there.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect this generator targets.
    fn dialect(&self) -> Dialect;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Returns the auto-increment keyword, if the dialect uses one.
    fn auto_increment_keyword(&self) -> Option<&'static str>;

    /// Returns the type rendered for `column`.
    fn column_type(&self, column: &ColumnSchema) -> String {
        column.sql_type.name_for(self.dialect())
    }

    /// Generates column definition SQL.
    fn column_definition(&self, column: &ColumnSchema) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), self.column_type(column)];

        if column.primary_key {
            parts.push("PRIMARY KEY".to_string());
            if column.auto_increment {
                parts.extend(self.auto_increment_keyword().map(str::to_string));
            }
        }

        if !column.nullable && !column.primary_key {
            parts.push("NOT NULL".to_string());
        }

        if column.unique && !column.primary_key {
            parts.push("UNIQUE".to_string());
        }

        if let Some(ref default) = column.default {
            parts.push(format!("DEFAULT {}", default.to_sql(self.dialect())));
        }

        parts.join(" ")
    }

    /// Generates SQL for creating a table.
    fn create_table_sql(&self, name: &str, columns: &[ColumnSchema]) -> String {
        let col_defs: Vec<String> = columns.iter().map(|c| self.column_definition(c)).collect();
        format!(
            "CREATE TABLE {} ({})",
            self.quote_identifier(name),
            col_defs.join(", ")
        )
    }

    /// Generates SQL for dropping a table.
    fn drop_table_sql(&self, name: &str) -> String {
        format!("DROP TABLE {}", self.quote_identifier(name))
    }

    /// Generates SQL for renaming a table.
    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates SQL for adding a column.
    fn add_column_sql(&self, table: &str, column: &ColumnSchema) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column)
        )]
    }

    /// Generates SQL for dropping a column.
    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Generates SQL for renaming a column.
    fn rename_column_sql(
        &self,
        _schema: &DatabaseSchema,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_identifier(table),
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        ))
    }

    /// Generates SQL for altering a column.
    fn alter_column_sql(
        &self,
        schema: &DatabaseSchema,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>>;

    /// Generates SQL for creating an index.
    fn create_index_sql(&self, name: &str, table: &str, columns: &[String], unique: bool) -> String {
        let quoted: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_identifier(name),
            self.quote_identifier(table),
            quoted.join(", ")
        )
    }

    /// Generates SQL for dropping an index.
    fn drop_index_sql(&self, name: &str, _table: &str) -> String {
        format!("DROP INDEX {}", self.quote_identifier(name))
    }

    /// Generates SQL for adding a foreign key.
    fn add_foreign_key_sql(&self, table: &str, foreign_key: &ForeignKeySchema) -> String {
        let quote_all = |cols: &[String]| {
            cols.iter()
                .map(|c| self.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            self.quote_identifier(table),
            self.quote_identifier(&foreign_key.name),
            quote_all(&foreign_key.columns),
            self.quote_identifier(&foreign_key.references_table),
            quote_all(&foreign_key.references_columns),
            foreign_key.on_delete.to_sql()
        )
    }

    /// Generates SQL for dropping a foreign key.
    fn drop_foreign_key_sql(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }

    /// Generates SQL for a migration operation.
    fn generate_sql(
        &self,
        operation: &MigrationOperation,
        schema: &DatabaseSchema,
    ) -> Result<Vec<String>> {
        let sql = match operation {
            MigrationOperation::CreateTable { name, columns } => {
                vec![self.create_table_sql(name, columns)]
            }
            MigrationOperation::DropTable { name } => vec![self.drop_table_sql(name)],
            MigrationOperation::RenameTable { old_name, new_name } => {
                vec![self.rename_table_sql(old_name, new_name)]
            }
            MigrationOperation::AddColumn { table, column } => self.add_column_sql(table, column),
            MigrationOperation::DropColumn { table, column } => {
                vec![self.drop_column_sql(table, column)]
            }
            MigrationOperation::RenameColumn {
                table,
                old_name,
                new_name,
            } => vec![self.rename_column_sql(schema, table, old_name, new_name)?],
            MigrationOperation::AlterColumn { changes, .. } if changes.is_empty() => Vec::new(),
            MigrationOperation::AlterColumn {
                table,
                column,
                changes,
            } => self.alter_column_sql(schema, table, column, changes)?,
            MigrationOperation::CreateIndex {
                name,
                table,
                columns,
                unique,
            } => vec![self.create_index_sql(name, table, columns, *unique)],
            MigrationOperation::DropIndex { name, table } => vec![self.drop_index_sql(name, table)],
            MigrationOperation::AddForeignKey { table, foreign_key } => {
                vec![self.add_foreign_key_sql(table, foreign_key)]
            }
            MigrationOperation::DropForeignKey { table, name } => {
                vec![self.drop_foreign_key_sql(table, name)]
            }
            MigrationOperation::RunSql { sql } => split_statements(sql),
            MigrationOperation::IgnoreMigration => vec![IGNORE_MIGRATION_SQL.to_string()],
        };
        Ok(sql)
    }
}

/// Returns the generator for `dialect`.
#[must_use]
pub fn generator_for(dialect: Dialect) -> Box<dyn MigrationDialect> {
    match dialect {
        Dialect::Sqlite => Box::new(SqliteDialect::new()),
        Dialect::Postgres => Box::new(PostgresDialect::new()),
        Dialect::Mysql => Box::new(MysqlDialect::new()),
    }
}
