//! Storage seams for conversion records.
//!
//! The relational store is the durable, authoritative side used for counts
//! and ordered history; the key-value cache is a secondary read path keyed
//! for reverse-chronological enumeration. The two are written independently
//! with no cross-store transaction.

pub mod kv;
pub mod memory;
pub mod sql;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::ConversionRecord;

/// Relational store: append-only rows with a synthetic primary key.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Appends a new row. Repeated identical records append again.
    async fn insert(&self, record: &ConversionRecord) -> Result<()>;

    /// Number of stored records, optionally restricted to one currency.
    async fn count(&self, currency: Option<&str>) -> Result<u64>;

    /// The most recent `n` records, newest first, optionally restricted to
    /// one currency (exact match).
    async fn last(&self, n: usize, currency: Option<&str>) -> Result<Vec<ConversionRecord>>;
}

/// Key-value cache keyed by `"{timestamp}-{currency}"`. A repeated key
/// overwrites (last-write-wins).
#[async_trait]
pub trait RateCache: Send + Sync {
    async fn put(&self, record: &ConversionRecord) -> Result<()>;

    /// Up to `n` most recent records by descending key order. The currency
    /// filter matches the decoded record field, not the raw key text.
    async fn last(&self, n: usize, currency: Option<&str>) -> Result<Vec<ConversionRecord>>;
}
