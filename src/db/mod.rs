mod models;

pub use models::*;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::config::DatabaseConfig;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open the pool described by the config and bring the schema up to date.
pub async fn init(config: &DatabaseConfig) -> Result<DbPool> {
    let options = match &config.url {
        Some(url) => {
            info!("Initializing database from connection string");
            SqliteConnectOptions::from_str(url)
                .with_context(|| "Invalid DATABASE_URL")?
                .create_if_missing(true)
        }
        None => {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create data directory: {}", parent.display())
                    })?;
                }
            }
            info!("Initializing database at {}", config.path.display());
            SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
        }
    };

    // Pragmas set on the options apply to every pooled connection
    let options = options
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Single-connection in-memory database with the full schema.
#[cfg(test)]
pub async fn init_in_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // Every connection to :memory: is its own database, so keep exactly one alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Accounts
    execute_sql(pool, include_str!("../../migrations/001_users.sql")).await?;

    // Migration 002: Per-title interactions
    execute_sql(pool, include_str!("../../migrations/002_interactions.sql")).await?;

    // Migration 003: Reviews and votes
    let has_reviews_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='review_votes'",
    )
    .fetch_optional(pool)
    .await?;
    if has_reviews_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/003_reviews.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}
