use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::StoreConfig;

/// Build the pool the store gateway acquires per-operation connections from.
pub async fn connect_pool(config: &StoreConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| AppError::StoreError(format!("Failed to parse database URL: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
        .map_err(|e| AppError::StoreError(format!("Failed to connect to database: {}", e)))?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::StoreError(format!("Database health check failed: {}", e)))?;

    tracing::info!(database_url = %config.database_url, "Connected to store");
    Ok(pool)
}

/// Single-connection in-memory pool; the connection is never recycled so the
/// database lives as long as the pool.
#[cfg(test)]
pub async fn connect_memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap()
}
