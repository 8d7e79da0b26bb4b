//! SQLite dialect for migrations.
//!
//! SQLite has limited ALTER TABLE support, so column alterations use the
//! table rebuild strategy: create `new__<table>`, copy the rows, drop the old
//! table and rename the new one into place.

use crate::error::Result;
use crate::operations::ColumnChanges;
use crate::schema::{DatabaseSchema, ForeignKeySchema, TableSchema};

use super::{Dialect, MigrationDialect, existing_column, existing_table};

/// Prefix of the temporary table used by rebuilds.
pub const REBUILD_PREFIX: &str = "new__";

/// SQLite migration dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates the statements that rebuild `table` into `rebuilt`.
    fn rebuild_table_sql(&self, table: &TableSchema, rebuilt: &TableSchema) -> Vec<String> {
        let temp_name = format!("{REBUILD_PREFIX}{}", table.name);
        let column_list = rebuilt
            .columns
            .iter()
            .map(|c| self.quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut statements = vec![
            self.create_table_sql(&temp_name, &rebuilt.columns),
            format!(
                "INSERT INTO {} ({column_list}) SELECT {column_list} FROM {}",
                self.quote_identifier(&temp_name),
                self.quote_identifier(&table.name)
            ),
            self.drop_table_sql(&table.name),
            self.rename_table_sql(&temp_name, &table.name),
        ];

        // Indexes disappear with the old table.
        statements.extend(
            rebuilt
                .indexes
                .iter()
                .map(|idx| self.create_index_sql(&idx.name, &table.name, &idx.columns, idx.unique)),
        );
        statements
    }
}

impl MigrationDialect for SqliteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTOINCREMENT")
    }

    fn alter_column_sql(
        &self,
        schema: &DatabaseSchema,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> Result<Vec<String>> {
        existing_column(schema, table, column)?;
        let original = existing_table(schema, table)?;

        let mut rebuilt = original.clone();
        if let Some(col) = rebuilt.get_column_mut(column) {
            changes.apply_to(col);
        }
        Ok(self.rebuild_table_sql(original, &rebuilt))
    }

    fn add_foreign_key_sql(&self, table: &str, foreign_key: &ForeignKeySchema) -> String {
        format!(
            "-- Foreign key {} cannot be added to {table} after table creation in SQLite.",
            foreign_key.name
        )
    }

    fn drop_foreign_key_sql(&self, table: &str, name: &str) -> String {
        format!("-- Foreign key {name} cannot be dropped from {table} in SQLite.")
    }
}
