//! Backward-compatibility rules.
//!
//! Each [`Rule`] recognizes one category of schema change that breaks code
//! still running against the previous schema, and reports it as a
//! [`Diagnostic`]. Rules look at one statement at a time; only `NOT_NULL`
//! peeks at later statements of the same migration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::statement::{ColumnChange, Statement, StatementKind, TableAction};

/// Category of a backward-incompatible change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// A table is renamed.
    RenameTable,
    /// A column is renamed.
    RenameColumn,
    /// A column is dropped.
    DropColumn,
    /// A table is dropped.
    DropTable,
    /// A column becomes NOT NULL without a default.
    NotNull,
    /// A column's type or definition changes.
    AlterColumn,
}

impl IssueCode {
    /// Returns the stable code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RenameTable => "RENAME_TABLE",
            Self::RenameColumn => "RENAME_COLUMN",
            Self::DropColumn => "DROP_COLUMN",
            Self::DropTable => "DROP_TABLE",
            Self::NotNull => "NOT_NULL",
            Self::AlterColumn => "ALTER_COLUMN",
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::RenameTable => "RENAMING tables",
            Self::RenameColumn => "RENAMING columns",
            Self::DropColumn => "DROPPING columns",
            Self::DropTable => "DROPPING tables",
            Self::NotNull => "NOT NULL constraint on columns",
            Self::AlterColumn => {
                "ALTERING columns (Could be backward compatible. You may ignore this migration.)"
            }
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backward-incompatible change found in a migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human-readable message.
    pub message: String,
    /// Issue code.
    pub code: IssueCode,
    /// Affected table, when it can be told.
    pub table: Option<String>,
    /// Affected column, when it can be told.
    pub column: Option<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with the code's message.
    #[must_use]
    pub fn new(code: IssueCode, table: Option<&str>, column: Option<&str>) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            table: table.map(str::to_string),
            column: column.map(str::to_string),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match (&self.table, &self.column) {
            (Some(table), Some(column)) => write!(f, " (table: {table}, column: {column})"),
            (Some(table), None) => write!(f, " (table: {table})"),
            _ => Ok(()),
        }
    }
}

/// How far `NOT_NULL` looks for a default set after adding a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotNullPolicy {
    /// Number of following statements searched. `None` searches the rest of
    /// the migration.
    pub lookahead: Option<usize>,
}

impl NotNullPolicy {
    /// Searches the rest of the migration.
    #[must_use]
    pub const fn rest_of_migration() -> Self {
        Self { lookahead: None }
    }

    /// Searches the next `statements` statements.
    #[must_use]
    pub const fn within(statements: usize) -> Self {
        Self {
            lookahead: Some(statements),
        }
    }

    /// Returns true if a later action of the migration sets a default on
    /// `table.column` before anything makes it NOT NULL again. Actions after
    /// the `ADD` in the same statement are searched first and do not count
    /// against the look-ahead.
    fn default_follows(
        self,
        statements: &[Statement],
        index: usize,
        table: &str,
        column: &str,
    ) -> bool {
        let end = match self.lookahead {
            Some(n) => (index + 1).saturating_add(n).min(statements.len()),
            None => statements.len(),
        };

        let same_statement = statements
            .get(index)
            .map_or(&[][..], |statement| table_actions(statement, table))
            .iter()
            .skip_while(|action| {
                !matches!(action, TableAction::AddColumn { column: c, .. } if c == column)
            })
            .skip(1);
        let later_statements = statements
            .get(index + 1..end)
            .unwrap_or_default()
            .iter()
            .flat_map(|statement| table_actions(statement, table));

        for action in same_statement.chain(later_statements) {
            match action {
                TableAction::AlterColumn {
                    column: c,
                    change: ColumnChange::SetDefault,
                } if c == column => return true,
                TableAction::AlterColumn {
                    column: c,
                    change: ColumnChange::SetNotNull,
                } if c == column => return false,
                _ => {}
            }
        }
        false
    }
}

/// Actions of `statement` if it alters `table`.
fn table_actions<'a>(statement: &'a Statement, table: &str) -> &'a [TableAction] {
    match &statement.kind {
        StatementKind::AlterTable {
            table: altered,
            actions,
        } if altered == table => actions,
        _ => &[],
    }
}

/// A backward-compatibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rule {
    /// `ALTER TABLE a RENAME TO b`, `RENAME TABLE a TO b`.
    RenameTable,
    /// `RENAME [COLUMN] a TO b`, `CHANGE a b ...`.
    RenameColumn,
    /// `DROP [COLUMN] c`.
    DropColumn,
    /// `DROP TABLE t`.
    DropTable,
    /// NOT NULL column added or redefined without default, or `SET NOT NULL`.
    NotNull,
    /// Type changes and full column redefinitions.
    AlterColumn,
}

impl Rule {
    /// All rules, in evaluation order.
    pub const ALL: [Self; 6] = [
        Self::RenameTable,
        Self::RenameColumn,
        Self::DropColumn,
        Self::DropTable,
        Self::NotNull,
        Self::AlterColumn,
    ];

    /// Returns the code this rule reports.
    #[must_use]
    pub const fn code(self) -> IssueCode {
        match self {
            Self::RenameTable => IssueCode::RenameTable,
            Self::RenameColumn => IssueCode::RenameColumn,
            Self::DropColumn => IssueCode::DropColumn,
            Self::DropTable => IssueCode::DropTable,
            Self::NotNull => IssueCode::NotNull,
            Self::AlterColumn => IssueCode::AlterColumn,
        }
    }

    /// Checks `statements[index]` and returns what it finds.
    ///
    /// Later statements are only consulted by `NOT_NULL`.
    #[must_use]
    pub fn check(
        self,
        statements: &[Statement],
        index: usize,
        not_null: NotNullPolicy,
    ) -> Vec<Diagnostic> {
        let Some(statement) = statements.get(index) else {
            return Vec::new();
        };
        let code = self.code();

        match (&statement.kind, self) {
            (StatementKind::RenameTable { .. }, Self::RenameTable) => {
                vec![Diagnostic::new(code, None, None)]
            }
            (StatementKind::DropTable { table }, Self::DropTable) => {
                vec![Diagnostic::new(code, Some(table.as_str()), None)]
            }
            (StatementKind::AlterTable { table, actions }, _) => actions
                .iter()
                .filter_map(|action| {
                    self.check_action(action, statements, index, table, not_null)
                        .map(|column| Diagnostic::new(code, Some(table.as_str()), Some(column)))
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the affected column if `action` violates this rule.
    fn check_action<'a>(
        self,
        action: &'a TableAction,
        statements: &[Statement],
        index: usize,
        table: &str,
        not_null: NotNullPolicy,
    ) -> Option<&'a str> {
        match (action, self) {
            (TableAction::RenameColumn { from, .. }, Self::RenameColumn) => Some(from.as_str()),
            (TableAction::DropColumn { column }, Self::DropColumn) => Some(column.as_str()),
            (
                TableAction::AddColumn {
                    column,
                    not_null: true,
                    has_default: false,
                },
                Self::NotNull,
            ) if !not_null.default_follows(statements, index, table, column) => {
                Some(column.as_str())
            }
            (
                TableAction::AlterColumn {
                    column,
                    change:
                        ColumnChange::SetNotNull
                        | ColumnChange::Redefine {
                            not_null: true,
                            has_default: false,
                        },
                },
                Self::NotNull,
            ) => Some(column.as_str()),
            (
                TableAction::AlterColumn {
                    column,
                    change: ColumnChange::SetType | ColumnChange::Redefine { .. },
                },
                Self::AlterColumn,
            ) => Some(column.as_str()),
            _ => None,
        }
    }
}

/// The ordered set of rules an analysis runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    not_null: NotNullPolicy,
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self {
            rules: Rule::ALL.to_vec(),
            not_null: NotNullPolicy::default(),
        }
    }
}

impl RuleCatalog {
    /// Creates the full catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `NOT_NULL` look-ahead policy.
    #[must_use]
    pub const fn with_not_null_policy(mut self, policy: NotNullPolicy) -> Self {
        self.not_null = policy;
        self
    }

    /// Returns the `NOT_NULL` look-ahead policy.
    #[must_use]
    pub const fn not_null_policy(&self) -> NotNullPolicy {
        self.not_null
    }

    /// Runs every rule against `statements[index]`, in catalog order.
    #[must_use]
    pub fn check(&self, statements: &[Statement], index: usize) -> Vec<Diagnostic> {
        self.rules
            .iter()
            .flat_map(|rule| rule.check(statements, index, self.not_null))
            .collect()
    }
}
