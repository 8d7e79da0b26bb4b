//! Lint orchestration.
//!
//! [`MigrationLinter`] walks a migration history in the order given. For each
//! migration it checks the ignore policy, then the cache, and only on a miss
//! asks the statement source for SQL and runs the analyzer. Verdicts are
//! written back to the cache, which is pruned and saved once per run.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::analyzer::{Analyzer, Verdict};
use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::dialect::Dialect;
use crate::error::{GenerationError, LintError, Result};
use crate::fingerprint;
use crate::migration::{MigrationDefinition, MigrationId};
use crate::policy::IgnorePolicy;
use crate::rules::{Diagnostic, RuleCatalog};
use crate::source::StatementSource;

/// What happened to one migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A verdict was reached, freshly or from the cache.
    Linted {
        /// The verdict.
        verdict: Verdict,
        /// Diagnostics, empty unless the verdict is `ERR`.
        diagnostics: Vec<Diagnostic>,
        /// Served from the cache without generating statements.
        cached: bool,
    },
    /// The statement source could not produce the migration's SQL.
    Failed {
        /// Why generation failed.
        reason: GenerationError,
    },
}

/// Result for one migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// The migration.
    pub id: MigrationId,
    /// What happened to it.
    pub outcome: Outcome,
}

impl MigrationReport {
    /// Returns the verdict, or `None` if generation failed.
    #[must_use]
    pub const fn verdict(&self) -> Option<Verdict> {
        match self.outcome {
            Outcome::Linted { verdict, .. } => Some(verdict),
            Outcome::Failed { .. } => None,
        }
    }

    /// Returns the diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self.outcome {
            Outcome::Linted {
                ref diagnostics, ..
            } => diagnostics,
            Outcome::Failed { .. } => &[],
        }
    }

    /// Returns true if the verdict came from the cache.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self.outcome, Outcome::Linted { cached: true, .. })
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})... ", self.id.app, self.id.name)?;
        match self.outcome {
            Outcome::Linted {
                verdict,
                ref diagnostics,
                cached,
            } => {
                write!(f, "{verdict}")?;
                if cached {
                    f.write_str(" (cached)")?;
                }
                for diagnostic in diagnostics {
                    write!(f, "\n\t{diagnostic}")?;
                }
                Ok(())
            }
            Outcome::Failed { ref reason } => write!(f, "FAILED\n\t{reason}"),
        }
    }
}

/// Aggregate result of a run, in migration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    /// One report per migration.
    pub migrations: Vec<MigrationReport>,
}

impl LintReport {
    /// Returns the report for `id`.
    #[must_use]
    pub fn get(&self, id: &MigrationId) -> Option<&MigrationReport> {
        self.migrations.iter().find(|m| &m.id == id)
    }

    /// Returns the verdicts in migration order; failures are `None`.
    #[must_use]
    pub fn verdicts(&self) -> Vec<Option<Verdict>> {
        self.migrations.iter().map(MigrationReport::verdict).collect()
    }

    /// Number of migrations with `verdict`.
    #[must_use]
    pub fn count(&self, verdict: Verdict) -> usize {
        self.migrations
            .iter()
            .filter(|m| m.verdict() == Some(verdict))
            .count()
    }

    /// Number of migrations whose statements could not be generated.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.migrations
            .iter()
            .filter(|m| matches!(m.outcome, Outcome::Failed { .. }))
            .count()
    }

    /// Number of migrations served from the cache.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.migrations.iter().filter(|m| m.is_cached()).count()
    }

    /// Returns true if any migration is `ERR`.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(Verdict::Err) > 0
    }

    /// Returns true if any migration failed to generate.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Returns true if the run passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.has_errors() && !self.has_failures()
    }

    /// One-line summary. Failed migrations count as erroneous.
    #[must_use]
    pub fn summary(&self) -> String {
        let total = self.migrations.len();
        format!(
            "Valid migrations: {}/{total} - erroneous migrations: {}/{total} - ignored migrations: {}/{total}",
            self.count(Verdict::Ok),
            self.count(Verdict::Err) + self.failed(),
            self.count(Verdict::Ignore),
        )
    }
}

/// Lints migration histories against one statement source.
///
/// A linter drives its source forward through the history, so each instance
/// is meant for a single [`lint`](Self::lint) run.
pub struct MigrationLinter<S> {
    source: S,
    analyzer: Analyzer,
    policy: IgnorePolicy,
    cache: Option<CacheStore>,
}

impl<S: StatementSource> MigrationLinter<S> {
    /// Creates a linter with the default catalog, no ignore policy and no
    /// cache.
    pub fn new(source: S) -> Self {
        Self {
            source,
            analyzer: Analyzer::default(),
            policy: IgnorePolicy::default(),
            cache: None,
        }
    }

    /// Memoizes verdicts in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the ignore policy.
    #[must_use]
    pub fn with_policy(mut self, policy: IgnorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the rule catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.analyzer = Analyzer::new(catalog);
        self
    }

    /// Returns the dialect being linted.
    pub fn dialect(&self) -> Dialect {
        self.source.dialect()
    }

    /// Returns the statement source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the cache, if any.
    pub const fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// Consumes the linter, returning the source and cache.
    pub fn into_parts(self) -> (S, Option<CacheStore>) {
        (self.source, self.cache)
    }

    /// Lints `migrations` in the order given and saves the cache.
    ///
    /// Generation failures are recorded in the report and do not stop the
    /// run. Errors are returned only for fingerprinting and cache
    /// persistence, in which case the cache file is left as it was.
    pub async fn lint(&mut self, migrations: &[MigrationDefinition]) -> Result<LintReport> {
        let dialect = self.source.dialect();
        info!(%dialect, migrations = migrations.len(), "Linting migrations");

        let mut touched = BTreeSet::new();
        let mut report = LintReport::default();

        for migration in migrations {
            let key = self.key_for(migration, dialect)?;
            let outcome = self.lint_one(migration, &key).await;
            touched.insert(key);

            match outcome {
                Outcome::Linted { verdict, cached, .. } => {
                    debug!(app = %migration.id.app, name = %migration.id.name, %verdict, cached, "Linted migration");
                }
                Outcome::Failed { ref reason } => {
                    warn!(app = %migration.id.app, name = %migration.id.name, error = %reason, "Migration failed");
                }
            }

            report.migrations.push(MigrationReport {
                id: migration.id.clone(),
                outcome,
            });
        }

        if let Some(ref mut cache) = self.cache {
            let before = cache.len();
            cache.retain(|entry| entry.key.dialect != dialect || touched.contains(&entry.key));
            debug!(pruned = before - cache.len(), "Pruned stale cache entries");
            cache.save()?;
        }

        info!(
            ok = report.count(Verdict::Ok),
            err = report.count(Verdict::Err),
            ignored = report.count(Verdict::Ignore),
            failed = report.failed(),
            cached = report.cached(),
            "Lint finished"
        );
        Ok(report)
    }

    fn key_for(&self, migration: &MigrationDefinition, dialect: Dialect) -> Result<CacheKey> {
        let reasons = self.policy.matches(migration);
        Ok(CacheKey::new(
            &migration.id,
            fingerprint::of_migration(migration)?,
            dialect,
            fingerprint::of_context(&reasons, self.analyzer.catalog())?,
        ))
    }

    async fn lint_one(&mut self, migration: &MigrationDefinition, key: &CacheKey) -> Outcome {
        if self.policy.ignores(migration) {
            debug!(migration = %migration.id, "Ignored by policy");
            let cached = self
                .cache
                .as_mut()
                .is_some_and(|cache| cache.get(key).is_some());
            self.source.skip(migration);
            self.store(key, Verdict::Ignore, Vec::new());
            return Outcome::Linted {
                verdict: Verdict::Ignore,
                diagnostics: Vec::new(),
                cached,
            };
        }

        if let Some(entry) = self.cache.as_mut().and_then(|cache| cache.get(key)) {
            debug!(migration = %migration.id, result = %entry.result, "Cache hit");
            let outcome = Outcome::Linted {
                verdict: entry.result,
                diagnostics: entry.errors.clone(),
                cached: true,
            };
            self.source.skip(migration);
            return outcome;
        }

        match self.source.generate(migration).await {
            Ok(statements) => {
                for sql in &statements {
                    debug!(migration = %migration.id, sql = %sql, "Generated");
                }
                let analysis = self.analyzer.analyze(&statements, key.dialect);
                let verdict = analysis.verdict();
                self.store(key, verdict, analysis.diagnostics.clone());
                Outcome::Linted {
                    verdict,
                    diagnostics: analysis.diagnostics,
                    cached: false,
                }
            }
            Err(reason) => Outcome::Failed { reason },
        }
    }

    fn store(&mut self, key: &CacheKey, verdict: Verdict, diagnostics: Vec<Diagnostic>) {
        if let Some(ref mut cache) = self.cache {
            cache.put(CacheEntry::new(key.clone(), verdict, diagnostics));
        }
    }
}

/// Returns the statements of `target`, generating every migration before it
/// in `migrations` first.
pub async fn sql_for<S: StatementSource>(
    source: &mut S,
    migrations: &[MigrationDefinition],
    target: &MigrationId,
) -> Result<Vec<String>> {
    let position = migrations
        .iter()
        .position(|m| &m.id == target)
        .ok_or_else(|| LintError::MigrationNotFound {
            app: target.app.clone(),
            name: target.name.clone(),
        })?;

    for migration in &migrations[..position] {
        source.skip(migration);
    }
    Ok(source.generate(&migrations[position]).await?)
}
