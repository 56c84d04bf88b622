//! Relational store on SQLite via sqlx.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::model::ConversionRecord;
use crate::store::RateStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS exchange_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    base TEXT NOT NULL,
    currency TEXT NOT NULL,
    rate REAL NOT NULL,
    original_amount REAL NOT NULL,
    converted_amount REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exchange_rates_currency
    ON exchange_rates (currency, timestamp);
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) a database file and ensures the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::with_pool(pool).await
    }

    /// An in-memory database, handy for tests.
    pub async fn open_in_memory() -> Result<Self> {
        // A single connection, otherwise each pooled connection would see
        // its own empty in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to initialize the exchange_rates schema")?;
        Ok(SqliteStore { pool })
    }
}

#[async_trait]
impl RateStore for SqliteStore {
    async fn insert(&self, record: &ConversionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO exchange_rates \
             (timestamp, base, currency, rate, original_amount, converted_amount) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.timestamp)
        .bind(&record.base)
        .bind(&record.currency)
        .bind(record.rate)
        .bind(record.original_amount)
        .bind(record.converted_amount)
        .execute(&self.pool)
        .await?;
        debug!("Inserted exchange_rates row for {}", record.currency);
        Ok(())
    }

    async fn count(&self, currency: Option<&str>) -> Result<u64> {
        let (count,): (i64,) = match currency {
            Some(currency) => {
                sqlx::query_as("SELECT COUNT(*) FROM exchange_rates WHERE currency = ?")
                    .bind(currency)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM exchange_rates")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count as u64)
    }

    async fn last(&self, n: usize, currency: Option<&str>) -> Result<Vec<ConversionRecord>> {
        // id breaks ties between rows sharing a timestamp
        let records = match currency {
            Some(currency) => {
                sqlx::query_as::<_, ConversionRecord>(
                    "SELECT timestamp, base, currency, rate, original_amount, converted_amount \
                     FROM exchange_rates WHERE currency = ? \
                     ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(currency)
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ConversionRecord>(
                    "SELECT timestamp, base, currency, rate, original_amount, converted_amount \
                     FROM exchange_rates \
                     ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(records)
    }
}
