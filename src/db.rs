//! Event journal.
//!
//! Every accepted log is journaled before it is applied, keyed by
//! `(transaction_hash, log_index)`. On startup the index is rebuilt by replaying the
//! journal in insertion order.
use std::str::FromStr as _;

use anyhow::{Context as _, Result};
use sqlx::{sqlite::SqliteConnectOptions, Row as _, SqlitePool};

use crate::events::LoggedEvent;

/// Open (creating if needed) the database at `url` and apply pending migrations.
pub async fn establish_pool(url: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(url)
        .context("failed to parse database options")?
        .create_if_missing(true);
    let db = SqlitePool::connect_with(opts)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!()
        .run(&db)
        .await
        .context("failed to apply migrations")?;
    Ok(db)
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{what} {value} out of range"))
}

/// Journal `logged`. Returns `false` if a log with the same identity is already present.
pub async fn append(db: &SqlitePool, logged: &LoggedEvent) -> Result<bool> {
    let payload = serde_json::to_string(logged).context("failed to serialize event")?;
    let meta = &logged.meta;

    let result = sqlx::query(
        r"
        INSERT OR IGNORE INTO events (transaction_hash, log_index, block_number, block_timestamp, name, payload)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(meta.transaction_hash.to_ascii_lowercase())
    .bind(to_i64(meta.log_index, "log index")?)
    .bind(to_i64(meta.block_number, "block number")?)
    .bind(to_i64(meta.block_timestamp, "block timestamp")?)
    .bind(logged.event.name())
    .bind(payload)
    .execute(db)
    .await
    .context("failed to journal event")?;

    Ok(result.rows_affected() > 0)
}

/// Every journaled event, oldest first.
pub async fn journal(db: &SqlitePool) -> Result<Vec<LoggedEvent>> {
    let rows = sqlx::query("SELECT seq, payload FROM events ORDER BY seq")
        .fetch_all(db)
        .await
        .context("failed to read journal")?;

    rows.iter()
        .map(|row| {
            let seq: i64 = row.try_get("seq")?;
            let payload: String = row.try_get("payload")?;
            serde_json::from_str(&payload).with_context(|| format!("journal entry {seq} is corrupt"))
        })
        .collect()
}

pub async fn journal_length(db: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(db)
        .await
        .context("failed to count journal")?;
    Ok(u64::try_from(count).unwrap_or_default())
}
