//! The conversion service: grab-and-save write path and validated reads.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, StoreKind};
use crate::model::ConversionRecord;
use crate::rate_provider::RateProvider;
use crate::store::{RateCache, RateStore};

/// Outcome of one store write. Failures are carried, not swallowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StoreStatus {
    Saved,
    Failed { error: String },
}

impl StoreStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, StoreStatus::Saved)
    }
}

/// Result of the write path: the persisted record plus one status per store.
/// The two writes are independent; neither rolls back the other.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub record: ConversionRecord,
    pub relational: StoreStatus,
    pub cache: StoreStatus,
}

/// Advisory warnings: successful responses that carry a message instead of
/// records.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryWarning {
    NoData,
    NoDataForCurrency { currency: String },
    Insufficient { currency: Option<String>, available: u64 },
}

impl fmt::Display for QueryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryWarning::NoData => {
                write!(f, "There is no exchange rates in database")
            }
            QueryWarning::NoDataForCurrency { currency } => {
                write!(f, "There is no exchange rates for {currency} in database")
            }
            QueryWarning::Insufficient {
                currency: Some(currency),
                available,
            } => write!(
                f,
                "Too large number of exchange rates for {currency}. \
                 Only {available} rates present"
            ),
            QueryWarning::Insufficient {
                currency: None,
                available,
            } => write!(
                f,
                "Too large number of exchange rates. Only {available} rates present"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryReply {
    Results {
        relational: Vec<ConversionRecord>,
        cache: Vec<ConversionRecord>,
    },
    Warning(QueryWarning),
}

pub struct ExchangeService {
    provider: Arc<dyn RateProvider>,
    store: Arc<dyn RateStore>,
    cache: Arc<dyn RateCache>,
    base_currency: String,
    round_digits: u32,
}

impl ExchangeService {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        store: Arc<dyn RateStore>,
        cache: Arc<dyn RateCache>,
        base_currency: &str,
        round_digits: u32,
    ) -> Self {
        ExchangeService {
            provider,
            store,
            cache,
            base_currency: base_currency.to_string(),
            round_digits,
        }
    }

    /// Fetches the latest rate for `currency`, converts `amount` (denominated
    /// in the base currency) and writes the record to both stores.
    pub async fn grab_and_save(&self, currency: &str, amount: f64) -> Result<SaveOutcome, Error> {
        let currency = normalize_currency(currency)?;
        if currency == self.base_currency {
            return Err(Error::SameAsBase(self.base_currency.clone()));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidAmount(amount));
        }

        let quote = self.provider.fetch_rate(&currency).await?;
        let record = quote.convert(amount, self.round_digits)?;

        let relational = write_status(StoreKind::Relational, self.store.insert(&record).await);
        let cache = write_status(StoreKind::Cache, self.cache.put(&record).await);

        info!(
            "Saved conversion {} {} -> {} {}",
            record.original_amount, record.base, record.converted_amount, record.currency
        );
        Ok(SaveOutcome {
            record,
            relational,
            cache,
        })
    }

    /// Reads the `n` most recent conversions from both stores, optionally
    /// filtered by currency. `n` defaults to 1.
    ///
    /// Validation runs against the relational store, the authoritative side;
    /// the cache returns at most what it holds.
    pub async fn query(
        &self,
        n: Option<usize>,
        currency: Option<&str>,
    ) -> Result<QueryReply, Error> {
        let n = n.unwrap_or(1);
        // Writes store uppercased codes; reads must match the same way
        let currency = currency.map(str::to_ascii_uppercase);
        let currency = currency.as_deref();

        if let Some(warning) = self.validate(n, currency).await? {
            warn!("Query for last {n} ({currency:?}): {warning}");
            return Ok(QueryReply::Warning(warning));
        }

        let relational = self
            .store
            .last(n, currency)
            .await
            .map_err(|e| store_read(StoreKind::Relational, e))?;
        let cache = self
            .cache
            .last(n, currency)
            .await
            .map_err(|e| store_read(StoreKind::Cache, e))?;

        Ok(QueryReply::Results { relational, cache })
    }

    async fn validate(
        &self,
        n: usize,
        currency: Option<&str>,
    ) -> Result<Option<QueryWarning>, Error> {
        let available = self
            .store
            .count(currency)
            .await
            .map_err(|e| store_read(StoreKind::Relational, e))?;

        let warning = match currency {
            Some(currency) if available == 0 => Some(QueryWarning::NoDataForCurrency {
                currency: currency.to_string(),
            }),
            Some(currency) if available < n as u64 => Some(QueryWarning::Insufficient {
                currency: Some(currency.to_string()),
                available,
            }),
            None if available == 0 => Some(QueryWarning::NoData),
            None if available < n as u64 => Some(QueryWarning::Insufficient {
                currency: None,
                available,
            }),
            _ => None,
        };
        Ok(warning)
    }
}

fn write_status(store: StoreKind, result: anyhow::Result<()>) -> StoreStatus {
    match result {
        Ok(()) => StoreStatus::Saved,
        Err(source) => {
            // The alternate format prints the full anyhow chain
            warn!("Write to the {store} store failed: {source:#}");
            let error = Error::StoreWrite {
                store,
                source: source.into(),
            };
            StoreStatus::Failed {
                error: error.to_string(),
            }
        }
    }
}

fn store_read(store: StoreKind, source: anyhow::Error) -> Error {
    Error::StoreRead {
        store,
        source: source.into(),
    }
}

fn normalize_currency(currency: &str) -> Result<String, Error> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidCurrency(currency.to_string()));
    }
    Ok(currency.to_ascii_uppercase())
}
