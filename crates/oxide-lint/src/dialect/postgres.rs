//! PostgreSQL dialect for migrations.

use crate::error::Result;
use crate::operations::ColumnChanges;
use crate::schema::{ColumnSchema, DatabaseSchema, SqlType};

use super::{Dialect, MigrationDialect, existing_column};

/// PostgreSQL migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MigrationDialect for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        // SERIAL types instead of a keyword
        None
    }

    fn column_type(&self, column: &ColumnSchema) -> String {
        if column.auto_increment {
            match column.sql_type {
                SqlType::BigInt => return "BIGSERIAL".to_string(),
                SqlType::SmallInt => return "SMALLSERIAL".to_string(),
                SqlType::Integer => return "SERIAL".to_string(),
                _ => {}
            }
        }
        column.sql_type.name_for(Dialect::Postgres)
    }

    fn alter_column_sql(
        &self,
        schema: &DatabaseSchema,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>> {
        existing_column(schema, table, column)?;

        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        );
        let mut statements = Vec::new();

        if let Some(ref sql_type) = changes.sql_type {
            let type_name = sql_type.name_for(Dialect::Postgres);
            statements.push(format!(
                "{prefix} TYPE {type_name} USING {}::{type_name}",
                self.quote_identifier(column)
            ));
        }
        if let Some(ref default) = changes.default {
            statements.push(format!(
                "{prefix} SET DEFAULT {}",
                default.to_sql(Dialect::Postgres)
            ));
        }
        if changes.drop_default {
            statements.push(format!("{prefix} DROP DEFAULT"));
        }
        match changes.nullable {
            Some(false) => statements.push(format!("{prefix} SET NOT NULL")),
            Some(true) => statements.push(format!("{prefix} DROP NOT NULL")),
            None => {}
        }

        Ok(statements)
    }
}
