//! MySQL dialect for migrations.
//!
//! MySQL restates the full column definition for renames (`CHANGE`) and type
//! or nullability changes (`MODIFY`), so both read the current column from the
//! tracked schema. Default-only changes use `ALTER COLUMN ... SET DEFAULT`.

use crate::error::Result;
use crate::operations::ColumnChanges;
use crate::schema::{ColumnSchema, DatabaseSchema};

use super::{Dialect, MigrationDialect, existing_column};

/// MySQL migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Column definition without the key constraints, for `CHANGE`/`MODIFY`.
    fn redefinition(&self, column: &ColumnSchema) -> String {
        let mut column = column.clone();
        column.primary_key = false;
        column.unique = false;
        self.column_definition(&column)
    }
}

impl MigrationDialect for MysqlDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn column_definition(&self, column: &ColumnSchema) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), self.column_type(column)];

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(ref default) = column.default {
            parts.push(format!("DEFAULT {}", default.to_sql(Dialect::Mysql)));
        }
        if column.auto_increment {
            parts.extend(self.auto_increment_keyword().map(str::to_string));
        }
        if column.unique && !column.primary_key {
            parts.push("UNIQUE".to_string());
        }
        if column.primary_key {
            parts.push("PRIMARY KEY".to_string());
        }

        parts.join(" ")
    }

    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "RENAME TABLE {} TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    fn rename_column_sql(
        &self,
        schema: &DatabaseSchema,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<String> {
        let mut column = existing_column(schema, table, old_name)?.clone();
        column.name = new_name.to_string();
        Ok(format!(
            "ALTER TABLE {} CHANGE {} {}",
            self.quote_identifier(table),
            self.quote_identifier(old_name),
            self.redefinition(&column)
        ))
    }

    fn alter_column_sql(
        &self,
        schema: &DatabaseSchema,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>> {
        let current = existing_column(schema, table, column)?;
        let table_name = self.quote_identifier(table);
        let column_name = self.quote_identifier(column);

        if changes.sql_type.is_none() && changes.nullable.is_none() {
            let mut statements = Vec::new();
            if let Some(ref default) = changes.default {
                statements.push(format!(
                    "ALTER TABLE {table_name} ALTER COLUMN {column_name} SET DEFAULT {}",
                    default.to_sql(Dialect::Mysql)
                ));
            }
            if changes.drop_default {
                statements.push(format!(
                    "ALTER TABLE {table_name} ALTER COLUMN {column_name} DROP DEFAULT"
                ));
            }
            return Ok(statements);
        }

        let mut altered = current.clone();
        changes.apply_to(&mut altered);
        Ok(vec![format!(
            "ALTER TABLE {table_name} MODIFY {}",
            self.redefinition(&altered)
        )])
    }

    fn drop_index_sql(&self, name: &str, table: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(name),
            self.quote_identifier(table)
        )
    }

    fn drop_foreign_key_sql(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }
}
