pub mod catering_firms;
pub mod customers;
pub mod deliveries;
pub mod orders;
pub mod payments;

use std::str::FromStr;

use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::{AppError, AppResult};

/// Opens the pool and applies pending migrations.
///
/// Idle connections are never reaped so that `sqlite::memory:` databases
/// (one per connection) survive for the life of the pool.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Fresh single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    connect("sqlite::memory:", 1)
        .await
        .expect("in-memory database")
}

// ── Column codecs ─────────────────────────────────────────────────────────────
// JSON-shaped fields are stored as TEXT, enums as their snake_case names.

pub(crate) fn to_json_text<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn to_json_text_opt<T: Serialize>(value: Option<&T>) -> AppResult<Option<String>> {
    value.map(to_json_text).transpose()
}

pub(crate) fn from_json_text<T: DeserializeOwned>(text: &str) -> AppResult<T> {
    Ok(serde_json::from_str(text)?)
}

pub(crate) fn from_json_text_opt<T: DeserializeOwned>(text: Option<String>) -> AppResult<Option<T>> {
    text.as_deref().map(from_json_text).transpose()
}

pub(crate) fn parse_column<T>(text: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    text.parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

/// Clamp a caller-supplied page size to 1..=100, defaulting to 10.
pub(crate) fn page_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(10).clamp(1, 100)
}
