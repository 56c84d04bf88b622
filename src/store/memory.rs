//! In-memory store implementations, used by ephemeral mode and unit tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::model::ConversionRecord;
use crate::store::{RateCache, RateStore};

/// Append-only vector standing in for the relational table.
#[derive(Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<ConversionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn insert(&self, record: &ConversionRecord) -> Result<()> {
        self.rows.lock().await.push(record.clone());
        Ok(())
    }

    async fn count(&self, currency: Option<&str>) -> Result<u64> {
        let rows = self.rows.lock().await;
        let count = match currency {
            Some(currency) => rows.iter().filter(|r| r.currency == currency).count(),
            None => rows.len(),
        };
        Ok(count as u64)
    }

    async fn last(&self, n: usize, currency: Option<&str>) -> Result<Vec<ConversionRecord>> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<(usize, &ConversionRecord)> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| currency.is_none_or(|c| r.currency == c))
            .collect();
        // Newest first; insertion order breaks timestamp ties the way the
        // relational store's id column does
        matching.sort_by_key(|(idx, r)| std::cmp::Reverse((r.timestamp, *idx)));
        Ok(matching
            .into_iter()
            .take(n)
            .map(|(_, r)| r.clone())
            .collect())
    }
}

/// Sorted map standing in for the key-value cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<BTreeMap<String, ConversionRecord>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateCache for MemoryCache {
    async fn put(&self, record: &ConversionRecord) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(record.cache_key(), record.clone());
        Ok(())
    }

    async fn last(&self, n: usize, currency: Option<&str>) -> Result<Vec<ConversionRecord>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .values()
            .rev()
            .filter(|r| currency.is_none_or(|c| r.currency == c))
            .take(n)
            .cloned()
            .collect())
    }
}
