mod models;

pub use models::*;

use anyhow::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::info;

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

/// How long a connection waits on another writer's lock before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite primary result code for a lock held by another connection
const SQLITE_BUSY: i32 = 5;

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    open(data_dir, BUSY_TIMEOUT).await
}

/// Open the database file under `data_dir` with an explicit lock wait.
pub async fn open(data_dir: &Path, busy_timeout: Duration) -> Result<DbPool> {
    let db_path = data_dir.join("rewardz.db");

    info!("Initializing database at {}", db_path.display());

    // WAL for concurrent readers; set per connection, not once on the pool
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    prepare(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Begin a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads and then writes fails with
/// `SQLITE_BUSY_SNAPSHOT` once another writer commits in between, so every
/// read-modify-write goes through here instead of `begin()`.
pub async fn begin_write(pool: &DbPool) -> sqlx::Result<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Whether `err` is SQLite reporting the database as locked by another writer
pub fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        // Extended codes (BUSY_SNAPSHOT, BUSY_TIMEOUT, ...) keep the primary code in the low byte
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| code & 0xff == SQLITE_BUSY),
        _ => false,
    }
}

/// Open a private in-memory database with the schema applied.
///
/// The pool is capped at one connection because every SQLite `:memory:`
/// connection is its own database.
pub async fn init_in_memory() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    prepare(&pool).await?;
    Ok(pool)
}

async fn prepare(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    run_migrations(pool).await
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: users, sessions, books and rentals
    let has_rentals_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='rentals'",
    )
    .fetch_optional(pool)
    .await?;
    if has_rentals_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}
