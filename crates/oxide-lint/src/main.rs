//! oxide-lint CLI
//!
//! Command-line tool for linting database migrations.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_lint::prelude::*;

/// Backward-compatibility linter for database migrations.
#[derive(Parser)]
#[command(name = "oxide-lint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./oxide-lint.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
struct Common {
    /// Target dialect (sqlite, postgres, mysql).
    #[arg(short, long, env = "OXIDE_LINT_DIALECT")]
    dialect: Option<Dialect>,

    /// Migrations directory.
    #[arg(short, long)]
    migrations_dir: Option<PathBuf>,

    /// Directory holding cache stores.
    #[arg(long, env = "OXIDE_LINT_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Cache store name (defaults to one per project and dialect).
    #[arg(long)]
    cache_name: Option<String>,
}

impl Common {
    fn apply(self, config: &mut LintConfig) {
        if self.dialect.is_some() {
            config.dialect = self.dialect;
        }
        if self.migrations_dir.is_some() {
            config.migrations_dir = self.migrations_dir;
        }
        if self.cache_dir.is_some() {
            config.cache_dir = self.cache_dir;
        }
        if self.cache_name.is_some() {
            config.cache_name = self.cache_name;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Lint all migrations.
    Lint {
        #[command(flatten)]
        common: Common,

        /// Do not read or write the cache.
        #[arg(long)]
        no_cache: bool,

        /// Run the generated SQL in an in-memory SQLite database.
        #[arg(long)]
        sandbox: bool,

        /// Ignore migrations whose name contains this string.
        #[arg(long)]
        ignore_name_contains: Option<String>,

        /// Ignore a migration by name, app/name or file path (repeatable).
        #[arg(long)]
        ignore_name: Vec<String>,

        /// Only lint these apps.
        #[arg(long, value_delimiter = ',')]
        include_apps: Vec<String>,

        /// Never lint these apps.
        #[arg(long, value_delimiter = ',')]
        exclude_apps: Vec<String>,

        /// Statements searched for a default after adding a NOT NULL column.
        #[arg(long)]
        not_null_lookahead: Option<usize>,
    },

    /// Show the SQL of one migration.
    #[command(name = "sqlmigrate")]
    SqlMigrate {
        #[command(flatten)]
        common: Common,

        /// App name.
        #[arg(short, long)]
        app: String,

        /// Migration name.
        #[arg(long)]
        migration: String,
    },

    /// Remove every cached verdict of the store.
    ClearCache {
        #[command(flatten)]
        common: Common,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = LintConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Lint {
            common,
            no_cache,
            sandbox,
            ignore_name_contains,
            ignore_name,
            include_apps,
            exclude_apps,
            not_null_lookahead,
        } => {
            common.apply(&mut config);
            config.no_cache |= no_cache;
            config.sandbox |= sandbox;
            if ignore_name_contains.is_some() {
                config.ignore.name_contains = ignore_name_contains;
            }
            config.ignore.names.extend(ignore_name);
            config.ignore.include_apps.extend(include_apps);
            config.ignore.exclude_apps.extend(exclude_apps);
            if not_null_lookahead.is_some() {
                config.not_null_lookahead = not_null_lookahead;
            }

            let migrations = load_migrations(config.migrations_dir())?;
            let report = if config.sandbox {
                lint(SqliteSandbox::for_dialect(config.dialect())?, &config, &migrations).await?
            } else {
                lint(GeneratedSource::for_dialect(config.dialect()), &config, &migrations).await?
            };

            for migration in &report.migrations {
                println!("{migration}");
            }
            println!("\n{}", report.summary());

            if !report.passed() {
                std::process::exit(1);
            }
        }

        Commands::SqlMigrate {
            common,
            app,
            migration,
        } => {
            common.apply(&mut config);
            let migrations = load_migrations(config.migrations_dir())?;
            let mut source = GeneratedSource::for_dialect(config.dialect());

            let statements =
                sql_for(&mut source, &migrations, &MigrationId::new(app, migration)).await?;
            for sql in statements {
                println!("{sql};");
            }
        }

        Commands::ClearCache { common } => {
            common.apply(&mut config);
            let mut store = CacheStore::open(config.cache_dir()?, config.cache_name());
            store.clear();
            store.save()?;
            info!(path = %store.path().display(), "Cache cleared");
        }
    }

    Ok(())
}

async fn lint<S: StatementSource>(
    source: S,
    config: &LintConfig,
    migrations: &[MigrationDefinition],
) -> anyhow::Result<LintReport> {
    let mut linter = MigrationLinter::new(source)
        .with_policy(config.ignore.clone())
        .with_catalog(config.catalog());
    if let Some(cache) = config.cache_store()? {
        info!(path = %cache.path().display(), "Using cache");
        linter = linter.with_cache(cache);
    }

    Ok(linter.lint(migrations).await?)
}
