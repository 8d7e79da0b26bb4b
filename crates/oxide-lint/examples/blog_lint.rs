//! Example: Linting a blog application's migrations
//!
//! Builds a small migration history in code and lints it for PostgreSQL and
//! SQLite, showing how the same change can be safe on one database and not
//! on the other.
//!
//! Run with: cargo run --example blog_lint -p oxide-lint

use oxide_lint::prelude::*;

fn create_users() -> MigrationDefinition {
    MigrationDefinition::new("blog", "0001_create_users").operation(
        MigrationOperation::create_table(
            "users",
            vec![
                ColumnSchema::new("id", SqlType::BigInt)
                    .primary_key()
                    .auto_increment(),
                ColumnSchema::new("username", SqlType::Varchar(100))
                    .not_null()
                    .unique(),
                ColumnSchema::new("is_active", SqlType::Boolean)
                    .not_null()
                    .default(DefaultValue::Bool(true)),
                ColumnSchema::new("created_at", SqlType::Timestamp)
                    .not_null()
                    .default(DefaultValue::Expression {
                        expression: "CURRENT_TIMESTAMP".to_string(),
                    }),
            ],
        ),
    )
}

fn create_posts() -> MigrationDefinition {
    MigrationDefinition::new("blog", "0002_create_posts")
        .depends_on("blog", "0001_create_users")
        .operation(MigrationOperation::create_table(
            "posts",
            vec![
                ColumnSchema::new("id", SqlType::BigInt)
                    .primary_key()
                    .auto_increment(),
                ColumnSchema::new("author_id", SqlType::BigInt).not_null(),
                ColumnSchema::new("title", SqlType::Varchar(200)).not_null(),
                ColumnSchema::new("body", SqlType::Text),
            ],
        ))
        .operation(MigrationOperation::create_index(
            "posts_author_idx",
            "posts",
            vec!["author_id".to_string()],
            false,
        ))
}

fn add_view_count() -> MigrationDefinition {
    MigrationDefinition::new("blog", "0003_posts_view_count")
        .depends_on("blog", "0002_create_posts")
        .operation(MigrationOperation::add_column(
            "posts",
            ColumnSchema::new("view_count", SqlType::Integer).not_null(),
        ))
        .operation(MigrationOperation::alter_column(
            "posts",
            "view_count",
            ColumnChanges::new().set_default(DefaultValue::Integer(0)),
        ))
}

fn rename_body() -> MigrationDefinition {
    MigrationDefinition::new("blog", "0004_rename_body")
        .depends_on("blog", "0003_posts_view_count")
        .operation(MigrationOperation::rename_column("posts", "body", "content"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let migrations = [create_users(), create_posts(), add_view_count(), rename_body()];

    for dialect in [Dialect::Postgres, Dialect::Sqlite] {
        println!("=== {dialect} ===\n");

        let mut source = GeneratedSource::for_dialect(dialect);
        println!("SQL for blog/0003_posts_view_count:");
        let target = MigrationId::new("blog", "0003_posts_view_count");
        for sql in sql_for(&mut source, &migrations, &target).await? {
            println!("  {sql};");
        }
        println!();

        let report = MigrationLinter::new(GeneratedSource::for_dialect(dialect))
            .lint(&migrations)
            .await?;
        for migration in &report.migrations {
            println!("{migration}");
        }
        println!("\n{}\n", report.summary());
    }

    Ok(())
}
