//! Statement analysis.
//!
//! Runs the rule catalog over the statements of one migration and derives
//! its verdict. Analysis is pure: the same statements, dialect and catalog
//! always give the same result.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialect::{Dialect, REBUILD_PREFIX};
use crate::rules::{Diagnostic, IssueCode, RuleCatalog};
use crate::statement::{Statement, StatementKind, split_statements};

/// Directive that excludes a migration from linting.
pub const IGNORE_DIRECTIVE: &str = "ignore";

/// Outcome of linting one migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Analyzed, nothing backward-incompatible found.
    #[serde(rename = "OK")]
    Ok,
    /// At least one diagnostic.
    #[serde(rename = "ERR")]
    Err,
    /// Excluded by policy or by an ignore directive.
    #[serde(rename = "IGNORE")]
    Ignore,
}

impl Verdict {
    /// Returns the report label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Err => "ERR",
            Self::Ignore => "IGNORE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing one migration's statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Diagnostics in statement order, then rule order.
    pub diagnostics: Vec<Diagnostic>,
    /// An ignore directive was found.
    pub ignored: bool,
}

impl Analysis {
    /// Derives the verdict.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.ignored {
            Verdict::Ignore
        } else if self.diagnostics.is_empty() {
            Verdict::Ok
        } else {
            Verdict::Err
        }
    }
}

/// Analyzes statements with the full default catalog.
#[must_use]
pub fn analyze<S: AsRef<str>>(statements: &[S], dialect: Dialect) -> Analysis {
    Analyzer::default().analyze(statements, dialect)
}

/// Runs a [`RuleCatalog`] over statement sequences.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    catalog: RuleCatalog,
}

impl Analyzer {
    /// Creates an analyzer for `catalog`.
    #[must_use]
    pub const fn new(catalog: RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Returns the catalog.
    #[must_use]
    pub const fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Analyzes the statements of one migration.
    ///
    /// An input holding several `;`-separated statements is split first.
    pub fn analyze<S: AsRef<str>>(&self, statements: &[S], dialect: Dialect) -> Analysis {
        let parsed: Vec<Statement> = statements
            .iter()
            .flat_map(|sql| split_statements(sql.as_ref()))
            .map(|sql| parse_or_opaque(&sql))
            .collect();

        let ignored = parsed.iter().any(|s| s.has_directive(IGNORE_DIRECTIVE));
        if ignored {
            return Analysis {
                diagnostics: Vec::new(),
                ignored,
            };
        }

        let folds = match dialect {
            Dialect::Sqlite => find_rebuilds(&parsed),
            Dialect::Postgres | Dialect::Mysql => vec![Fold::None; parsed.len()],
        };

        let mut diagnostics = Vec::new();
        for (index, fold) in folds.iter().enumerate() {
            match fold {
                Fold::Start(table) => diagnostics.push(Diagnostic::new(
                    IssueCode::AlterColumn,
                    Some(table.as_str()),
                    None,
                )),
                Fold::Inner => {}
                Fold::None => diagnostics.extend(self.catalog.check(&parsed, index)),
            }
        }

        Analysis {
            diagnostics,
            ignored,
        }
    }
}

fn parse_or_opaque(sql: &str) -> Statement {
    Statement::parse(sql).unwrap_or_else(|error| {
        debug!(%error, sql, "Unparseable statement, no rule applies");
        Statement {
            sql: sql.to_string(),
            kind: StatementKind::Other,
            comments: Vec::new(),
        }
    })
}

/// Role of a statement in a SQLite table rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fold {
    /// Not part of a rebuild.
    None,
    /// `CREATE TABLE "new__t"` opening a rebuild of `t`.
    Start(String),
    /// Copy, drop or rename step of a rebuild.
    Inner,
}

/// Finds `CREATE TABLE new__t` .. `DROP TABLE t` .. `ALTER TABLE new__t
/// RENAME TO t` sequences. The copy (`INSERT INTO new__t`) is optional.
fn find_rebuilds(statements: &[Statement]) -> Vec<Fold> {
    let mut folds = vec![Fold::None; statements.len()];

    for (start, statement) in statements.iter().enumerate() {
        let StatementKind::CreateTable { table: temp } = &statement.kind else {
            continue;
        };
        let Some(target) = temp.strip_prefix(REBUILD_PREFIX) else {
            continue;
        };
        if folds[start] != Fold::None {
            continue;
        }

        let mut steps = Vec::new();
        let mut dropped = false;
        for (offset, later) in statements[start + 1..].iter().enumerate() {
            let index = start + 1 + offset;
            match &later.kind {
                StatementKind::Insert { table } if table == temp && !dropped => steps.push(index),
                StatementKind::DropTable { table } if table == target && !dropped => {
                    steps.push(index);
                    dropped = true;
                }
                StatementKind::RenameTable { from, to } if dropped && from == temp && to == target => {
                    steps.push(index);
                    folds[start] = Fold::Start(target.to_string());
                    for step in &steps {
                        folds[*step] = Fold::Inner;
                    }
                    break;
                }
                _ => {}
            }
        }
    }

    folds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::NotNullPolicy;

    fn codes(analysis: &Analysis) -> Vec<IssueCode> {
        analysis.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_verdict_serialization() {
        assert_eq!(serde_json::to_string(&Verdict::Ok).unwrap(), "\"OK\"");
        assert_eq!(serde_json::to_string(&Verdict::Err).unwrap(), "\"ERR\"");
        assert_eq!(
            serde_json::from_str::<Verdict>("\"IGNORE\"").unwrap(),
            Verdict::Ignore
        );
    }

    #[test]
    fn test_empty_migration_is_ok() {
        let analysis = analyze::<&str>(&[], Dialect::Postgres);
        assert_eq!(analysis.verdict(), Verdict::Ok);
    }

    #[test]
    fn test_add_not_null_column_postgres() {
        let analysis = analyze(
            &["ALTER TABLE \"users\" ADD COLUMN \"age\" integer NOT NULL"],
            Dialect::Postgres,
        );
        assert_eq!(analysis.verdict(), Verdict::Err);
        assert_eq!(
            analysis.diagnostics,
            vec![Diagnostic::new(IssueCode::NotNull, Some("users"), Some("age"))]
        );
    }

    #[test]
    fn test_statement_order_then_rule_order() {
        let analysis = analyze(
            &[
                "ALTER TABLE \"a\" DROP COLUMN \"x\"",
                "ALTER TABLE \"a\" RENAME TO \"b\"",
                "DROP TABLE \"c\"",
            ],
            Dialect::Postgres,
        );
        assert_eq!(
            codes(&analysis),
            vec![IssueCode::DropColumn, IssueCode::RenameTable, IssueCode::DropTable]
        );
    }

    #[test]
    fn test_ignore_directive_wins() {
        let analysis = analyze(
            &["DROP TABLE \"users\"", "-- oxide-lint: ignore migration"],
            Dialect::Sqlite,
        );
        assert!(analysis.ignored);
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.verdict(), Verdict::Ignore);
    }

    #[test]
    fn test_unparseable_statement_matches_nothing() {
        let analysis = analyze(
            &["DROP TABLE \"users", "ALTER TABLE"],
            Dialect::Postgres,
        );
        assert_eq!(analysis.verdict(), Verdict::Ok);
    }

    #[test]
    fn test_multi_statement_input_is_split() {
        let analysis = analyze(
            &["ALTER TABLE \"a\" ADD COLUMN \"x\" integer; DROP TABLE \"b\""],
            Dialect::Postgres,
        );
        assert_eq!(
            analysis.diagnostics,
            vec![Diagnostic::new(IssueCode::DropTable, Some("b"), None)]
        );

        // A later statement's DEFAULT belongs to another column.
        let analysis = analyze(
            &["ALTER TABLE \"a\" ADD COLUMN \"x\" integer NOT NULL; \
               ALTER TABLE \"a\" ALTER COLUMN \"y\" SET DEFAULT 0"],
            Dialect::Postgres,
        );
        assert_eq!(
            analysis.diagnostics,
            vec![Diagnostic::new(IssueCode::NotNull, Some("a"), Some("x"))]
        );
    }

    fn rebuild() -> Vec<&'static str> {
        vec![
            "CREATE TABLE \"new__users\" (\"id\" INTEGER PRIMARY KEY, \"age\" INTEGER NOT NULL)",
            "INSERT INTO \"new__users\" (\"id\", \"age\") SELECT \"id\", \"age\" FROM \"users\"",
            "DROP TABLE \"users\"",
            "ALTER TABLE \"new__users\" RENAME TO \"users\"",
            "CREATE INDEX \"users_age_idx\" ON \"users\" (\"age\")",
        ]
    }

    #[test]
    fn test_sqlite_rebuild_folds_into_alter_column() {
        let analysis = analyze(&rebuild(), Dialect::Sqlite);
        assert_eq!(
            analysis.diagnostics,
            vec![Diagnostic::new(IssueCode::AlterColumn, Some("users"), None)]
        );
    }

    #[test]
    fn test_rebuild_is_not_folded_outside_sqlite() {
        let analysis = analyze(&rebuild(), Dialect::Postgres);
        assert_eq!(
            codes(&analysis),
            vec![IssueCode::DropTable, IssueCode::RenameTable]
        );
    }

    #[test]
    fn test_incomplete_rebuild_is_not_folded() {
        let analysis = analyze(
            &[
                "CREATE TABLE \"new__users\" (\"id\" INTEGER)",
                "DROP TABLE \"users\"",
            ],
            Dialect::Sqlite,
        );
        assert_eq!(codes(&analysis), vec![IssueCode::DropTable]);
    }

    #[test]
    fn test_custom_catalog_lookahead() {
        let statements = [
            "ALTER TABLE \"users\" ADD COLUMN \"age\" integer NOT NULL",
            "UPDATE \"users\" SET \"age\" = 0",
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" SET DEFAULT 0",
        ];
        assert_eq!(analyze(&statements, Dialect::Postgres).verdict(), Verdict::Ok);

        let narrow =
            Analyzer::new(RuleCatalog::new().with_not_null_policy(NotNullPolicy::within(1)));
        assert_eq!(
            narrow.analyze(&statements, Dialect::Postgres).verdict(),
            Verdict::Err
        );
    }

    #[test]
    fn test_deterministic() {
        let statements = rebuild();
        assert_eq!(
            analyze(&statements, Dialect::Sqlite),
            analyze(&statements, Dialect::Sqlite)
        );
    }
}
