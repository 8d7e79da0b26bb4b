//! Migration operations.
//!
//! Every schema change a migration file can declare. In TOML each operation is
//! a table tagged by `op`:
//!
//! ```toml
//! [[operations]]
//! op = "add_column"
//! table = "users"
//! column = { name = "age", type = "integer", nullable = false }
//! ```

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnSchema, DefaultValue, ForeignKeySchema, SqlType};

/// Changes to apply to an existing column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnChanges {
    /// New data type (if changing).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<SqlType>,
    /// New nullability (if changing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// New default value (if changing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Removes the current default.
    #[serde(default)]
    pub drop_default: bool,
}

impl ColumnChanges {
    /// Creates empty column changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a new type.
    #[must_use]
    pub fn set_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// Sets nullability.
    #[must_use]
    pub const fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Sets default value.
    #[must_use]
    pub fn set_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self.drop_default = false;
        self
    }

    /// Drops the default value.
    #[must_use]
    pub fn drop_default(mut self) -> Self {
        self.default = None;
        self.drop_default = true;
        self
    }

    /// Returns true if no changes are specified.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sql_type.is_none()
            && self.nullable.is_none()
            && self.default.is_none()
            && !self.drop_default
    }

    /// Applies these changes to a column definition.
    pub fn apply_to(&self, column: &mut ColumnSchema) {
        if let Some(ref sql_type) = self.sql_type {
            column.sql_type = sql_type.clone();
        }
        if let Some(nullable) = self.nullable {
            column.nullable = nullable;
        }
        if let Some(ref default) = self.default {
            column.default = Some(default.clone());
        }
        if self.drop_default {
            column.default = None;
        }
    }
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MigrationOperation {
    /// Create a new table.
    CreateTable {
        /// Table name.
        name: String,
        /// Column definitions.
        columns: Vec<ColumnSchema>,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        name: String,
    },

    /// Rename a table.
    RenameTable {
        /// Old table name.
        old_name: String,
        /// New table name.
        new_name: String,
    },

    /// Add a column to a table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnSchema,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Rename a column.
    RenameColumn {
        /// Table name.
        table: String,
        /// Old column name.
        old_name: String,
        /// New column name.
        new_name: String,
    },

    /// Alter a column's properties.
    AlterColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Changes to apply.
        changes: ColumnChanges,
    },

    /// Create an index.
    CreateIndex {
        /// Index name.
        name: String,
        /// Table name.
        table: String,
        /// Columns to index.
        columns: Vec<String>,
        /// Whether this is a unique index.
        #[serde(default)]
        unique: bool,
    },

    /// Drop an index.
    DropIndex {
        /// Index name.
        name: String,
        /// Table name (MySQL needs it).
        table: String,
    },

    /// Add a foreign key constraint.
    AddForeignKey {
        /// Table name.
        table: String,
        /// Foreign key definition.
        foreign_key: ForeignKeySchema,
    },

    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// Run raw SQL (data migrations, custom DDL).
    RunSql {
        /// SQL statement(s) executed verbatim.
        sql: String,
    },

    /// Marks the whole migration as excluded from linting.
    IgnoreMigration,
}

impl MigrationOperation {
    /// Creates a CreateTable operation.
    #[must_use]
    pub fn create_table(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self::CreateTable {
            name: name.into(),
            columns,
        }
    }

    /// Creates a DropTable operation.
    #[must_use]
    pub fn drop_table(name: impl Into<String>) -> Self {
        Self::DropTable { name: name.into() }
    }

    /// Creates a RenameTable operation.
    #[must_use]
    pub fn rename_table(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::RenameTable {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Creates an AddColumn operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnSchema) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a DropColumn operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a RenameColumn operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::RenameColumn {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Creates an AlterColumn operation.
    #[must_use]
    pub fn alter_column(
        table: impl Into<String>,
        column: impl Into<String>,
        changes: ColumnChanges,
    ) -> Self {
        Self::AlterColumn {
            table: table.into(),
            column: column.into(),
            changes,
        }
    }

    /// Creates a CreateIndex operation.
    #[must_use]
    pub fn create_index(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        unique: bool,
    ) -> Self {
        Self::CreateIndex {
            name: name.into(),
            table: table.into(),
            columns,
            unique,
        }
    }

    /// Creates a RunSql operation.
    #[must_use]
    pub fn run_sql(sql: impl Into<String>) -> Self {
        Self::RunSql { sql: sql.into() }
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { name, .. } => format!("Create table '{name}'"),
            Self::DropTable { name } => format!("Drop table '{name}'"),
            Self::RenameTable { old_name, new_name } => {
                format!("Rename table '{old_name}' to '{new_name}'")
            }
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::DropColumn { table, column } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::RenameColumn {
                table,
                old_name,
                new_name,
            } => format!("Rename column '{old_name}' to '{new_name}' in table '{table}'"),
            Self::AlterColumn { table, column, .. } => {
                format!("Alter column '{column}' in table '{table}'")
            }
            Self::CreateIndex { name, table, .. } => {
                format!("Create index '{name}' on table '{table}'")
            }
            Self::DropIndex { name, .. } => format!("Drop index '{name}'"),
            Self::AddForeignKey { table, foreign_key } => format!(
                "Add foreign key '{}' to table '{table}'",
                foreign_key.name
            ),
            Self::DropForeignKey { table, name } => {
                format!("Drop foreign key '{name}' from table '{table}'")
            }
            Self::RunSql { .. } => "Run custom SQL".to_string(),
            Self::IgnoreMigration => "Ignore this migration when linting".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_changes() {
        let changes = ColumnChanges::new()
            .set_type(SqlType::Text)
            .set_nullable(false);

        assert!(!changes.is_empty());
        assert_eq!(changes.sql_type, Some(SqlType::Text));
        assert_eq!(changes.nullable, Some(false));
        assert!(ColumnChanges::new().is_empty());
    }

    #[test]
    fn test_apply_changes_to_column() {
        let mut column =
            ColumnSchema::new("age", SqlType::Integer).default(DefaultValue::Integer(1));

        ColumnChanges::new()
            .set_type(SqlType::BigInt)
            .set_nullable(false)
            .drop_default()
            .apply_to(&mut column);

        assert_eq!(column.sql_type, SqlType::BigInt);
        assert!(!column.nullable);
        assert_eq!(column.default, None);
    }

    #[test]
    fn test_operations_from_toml() {
        #[derive(Deserialize)]
        struct File {
            operations: Vec<MigrationOperation>,
        }

        let file: File = toml::from_str(
            r#"
            [[operations]]
            op = "add_column"
            table = "users"
            column = { name = "age", type = "integer", nullable = false }

            [[operations]]
            op = "alter_column"
            table = "users"
            column = "age"
            changes = { default = 0 }

            [[operations]]
            op = "ignore_migration"
            "#,
        )
        .unwrap();

        assert_eq!(file.operations.len(), 3);
        assert_eq!(
            file.operations[0],
            MigrationOperation::add_column(
                "users",
                ColumnSchema::new("age", SqlType::Integer).not_null()
            )
        );
        assert_eq!(
            file.operations[1],
            MigrationOperation::alter_column(
                "users",
                "age",
                ColumnChanges::new().set_default(DefaultValue::Integer(0))
            )
        );
        assert_eq!(file.operations[2], MigrationOperation::IgnoreMigration);
    }

    #[test]
    fn test_description() {
        let op = MigrationOperation::rename_column("users", "name", "full_name");
        assert_eq!(
            op.description(),
            "Rename column 'name' to 'full_name' in table 'users'"
        );
    }
}
