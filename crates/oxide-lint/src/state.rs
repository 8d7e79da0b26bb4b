//! Schema state tracking.
//!
//! Statement sources replay every migration's operations, generated or
//! skipped, so the schema they see always matches what the earlier migrations
//! built. Dialects read table and column shapes from here.

use crate::error::{LintError, Result};
use crate::migration::MigrationDefinition;
use crate::operations::MigrationOperation;
use crate::schema::{DatabaseSchema, IndexSchema, TableSchema};

fn missing_table(name: &str) -> LintError {
    LintError::InvalidState(format!("Table '{name}' does not exist"))
}

fn missing_column(table: &str, column: &str) -> LintError {
    LintError::InvalidState(format!(
        "Column '{column}' does not exist in table '{table}'"
    ))
}

/// The schema built by the migrations replayed so far.
#[derive(Debug, Default, Clone)]
pub struct SchemaState {
    schema: DatabaseSchema,
}

impl SchemaState {
    /// Creates a new empty schema state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableSchema> {
        self.schema
            .get_table_mut(name)
            .ok_or_else(|| missing_table(name))
    }

    /// Applies a migration's operations to the schema state.
    ///
    /// On error the state is left unchanged.
    pub fn apply_migration(&mut self, migration: &MigrationDefinition) -> Result<()> {
        let mut next = self.clone();
        for operation in &migration.operations {
            next.apply_operation(operation)?;
        }
        *self = next;
        Ok(())
    }

    /// Applies a single operation to the schema state.
    pub fn apply_operation(&mut self, operation: &MigrationOperation) -> Result<()> {
        match operation {
            MigrationOperation::CreateTable { name, columns } => {
                if self.schema.get_table(name).is_some() {
                    return Err(LintError::InvalidState(format!(
                        "Table '{name}' already exists"
                    )));
                }
                let table = columns
                    .iter()
                    .cloned()
                    .fold(TableSchema::new(name.clone()), TableSchema::column);
                self.schema.tables.push(table);
            }

            MigrationOperation::DropTable { name } => {
                let idx = self
                    .schema
                    .tables
                    .iter()
                    .position(|t| t.name == *name)
                    .ok_or_else(|| missing_table(name))?;
                self.schema.tables.remove(idx);
            }

            MigrationOperation::RenameTable { old_name, new_name } => {
                if self.schema.get_table(new_name).is_some() {
                    return Err(LintError::InvalidState(format!(
                        "Table '{new_name}' already exists"
                    )));
                }
                self.table_mut(old_name)?.name = new_name.clone();
            }

            MigrationOperation::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.get_column(&column.name).is_some() {
                    return Err(LintError::InvalidState(format!(
                        "Column '{}' already exists in table '{table}'",
                        column.name
                    )));
                }
                t.columns.push(column.clone());
            }

            MigrationOperation::DropColumn { table, column } => {
                let t = self.table_mut(table)?;
                let idx = t
                    .columns
                    .iter()
                    .position(|c| c.name == *column)
                    .ok_or_else(|| missing_column(table, column))?;
                t.columns.remove(idx);
                t.primary_key.retain(|c| c != column);
                t.indexes.retain(|i| !i.columns.contains(column));
            }

            MigrationOperation::RenameColumn {
                table,
                old_name,
                new_name,
            } => {
                let t = self.table_mut(table)?;
                if t.get_column(new_name).is_some() {
                    return Err(LintError::InvalidState(format!(
                        "Column '{new_name}' already exists in table '{table}'"
                    )));
                }
                let col = t
                    .get_column_mut(old_name)
                    .ok_or_else(|| missing_column(table, old_name))?;
                col.name = new_name.clone();

                let rename = |c: &mut String| {
                    if c == old_name {
                        c.clone_from(new_name);
                    }
                };
                t.primary_key.iter_mut().for_each(rename);
                for index in &mut t.indexes {
                    index.columns.iter_mut().for_each(rename);
                }
            }

            MigrationOperation::AlterColumn {
                table,
                column,
                changes,
            } => {
                let t = self.table_mut(table)?;
                let col = t
                    .get_column_mut(column)
                    .ok_or_else(|| missing_column(table, column))?;
                changes.apply_to(col);
            }

            MigrationOperation::CreateIndex {
                name,
                table,
                columns,
                unique,
            } => {
                let t = self.table_mut(table)?;
                if let Some(missing) = columns.iter().find(|c| t.get_column(c).is_none()) {
                    return Err(missing_column(table, missing));
                }
                t.indexes.push(IndexSchema {
                    name: name.clone(),
                    columns: columns.clone(),
                    unique: *unique,
                });
            }

            MigrationOperation::DropIndex { name, table } => {
                let t = self.table_mut(table)?;
                let idx = t
                    .indexes
                    .iter()
                    .position(|i| i.name == *name)
                    .ok_or_else(|| {
                        LintError::InvalidState(format!(
                            "Index '{name}' does not exist on table '{table}'"
                        ))
                    })?;
                t.indexes.remove(idx);
            }

            MigrationOperation::AddForeignKey { table, foreign_key } => {
                if self.schema.get_table(&foreign_key.references_table).is_none() {
                    return Err(missing_table(&foreign_key.references_table));
                }
                self.table_mut(table)?.foreign_keys.push(foreign_key.clone());
            }

            MigrationOperation::DropForeignKey { table, name } => {
                let t = self.table_mut(table)?;
                let idx = t
                    .foreign_keys
                    .iter()
                    .position(|fk| fk.name == *name)
                    .ok_or_else(|| {
                        LintError::InvalidState(format!(
                            "Foreign key '{name}' does not exist in table '{table}'"
                        ))
                    })?;
                t.foreign_keys.remove(idx);
            }

            // Raw SQL doesn't affect the tracked schema state
            MigrationOperation::RunSql { .. } | MigrationOperation::IgnoreMigration => {}
        }

        Ok(())
    }

    /// Reconstructs schema from a list of migrations.
    pub fn from_migrations(migrations: &[MigrationDefinition]) -> Result<Self> {
        let mut state = Self::new();
        for migration in migrations {
            state.apply_migration(migration)?;
        }
        Ok(state)
    }
}
