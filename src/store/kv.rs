//! Key-value cache on fjall.
//!
//! Records are stored JSON-encoded under `"{timestamp}-{currency}"`, so a
//! reverse iteration over the sorted keyspace yields newest-first order.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, warn};

use crate::model::ConversionRecord;
use crate::store::RateCache;

const PARTITION: &str = "exchange_rates";

pub struct FjallCache {
    _keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallCache {
    pub fn open(path: &Path) -> Result<Self> {
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open cache at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open the exchange_rates partition")?;
        Ok(FjallCache {
            _keyspace: keyspace,
            partition,
        })
    }
}

#[async_trait]
impl RateCache for FjallCache {
    async fn put(&self, record: &ConversionRecord) -> Result<()> {
        let key = record.cache_key();
        let value = serde_json::to_vec(record)?;
        self.partition.insert(key.as_bytes(), value)?;
        debug!("Cache PUT for key {}", key);
        Ok(())
    }

    async fn last(&self, n: usize, currency: Option<&str>) -> Result<Vec<ConversionRecord>> {
        let mut records = Vec::new();
        for entry in self.partition.iter().rev() {
            if records.len() == n {
                break;
            }
            let (key, value) = entry?;
            let record: ConversionRecord = match serde_json::from_slice(&value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        "Skipping undecodable cache entry {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    continue;
                }
            };
            // Filter on the decoded field; matching the raw key text would
            // false-positive on codes embedded in other key parts.
            if let Some(currency) = currency {
                if record.currency != currency {
                    continue;
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(timestamp: i64, currency: &str) -> ConversionRecord {
        ConversionRecord {
            timestamp,
            base: "USD".to_string(),
            currency: currency.to_string(),
            rate: 0.9,
            original_amount: 10.0,
            converted_amount: 11.11111,
        }
    }

    #[tokio::test]
    async fn test_put_and_read_newest_first() {
        let dir = tempdir().unwrap();
        let cache = FjallCache::open(dir.path()).unwrap();

        cache.put(&record(1549705945, "EUR")).await.unwrap();
        cache.put(&record(1549705947, "GBP")).await.unwrap();
        cache.put(&record(1549705946, "EUR")).await.unwrap();

        let last = cache.last(2, None).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].currency, "GBP");
        assert_eq!(last[1].timestamp, 1549705946);
    }

    #[tokio::test]
    async fn test_currency_filter_uses_decoded_field() {
        let dir = tempdir().unwrap();
        let cache = FjallCache::open(dir.path()).unwrap();

        cache.put(&record(1549705945, "EUR")).await.unwrap();
        cache.put(&record(1549705946, "GBP")).await.unwrap();

        let last = cache.last(5, Some("EUR")).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].currency, "EUR");

        // No substring trap: "EU" is not a stored currency
        assert!(cache.last(5, Some("EU")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_skipped() {
        let dir = tempdir().unwrap();
        let cache = FjallCache::open(dir.path()).unwrap();

        cache.put(&record(1549705945, "EUR")).await.unwrap();
        // Raw bytes that are not a JSON-encoded record
        cache
            .partition
            .insert(&b"1549705999-XXX"[..], &b"garbage"[..])
            .unwrap();
        cache.put(&record(1549706000, "GBP")).await.unwrap();

        // The bad entry neither fails the read nor consumes a result slot
        let last = cache.last(2, None).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].currency, "GBP");
        assert_eq!(last[1].currency, "EUR");
    }

    #[tokio::test]
    async fn test_same_key_overwrites() {
        let dir = tempdir().unwrap();
        let cache = FjallCache::open(dir.path()).unwrap();

        let mut r = record(1549705945, "EUR");
        cache.put(&r).await.unwrap();
        r.original_amount = 42.0;
        cache.put(&r).await.unwrap();

        let last = cache.last(10, None).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].original_amount, 42.0);
    }

    #[tokio::test]
    async fn test_fewer_entries_than_requested() {
        let dir = tempdir().unwrap();
        let cache = FjallCache::open(dir.path()).unwrap();

        cache.put(&record(1549705945, "EUR")).await.unwrap();

        let last = cache.last(10, None).await.unwrap();
        assert_eq!(last.len(), 1);
    }
}
