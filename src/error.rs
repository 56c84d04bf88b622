//! Error taxonomy shared across the service.

use std::fmt;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which of the two stores an operation was talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Relational,
    Cache,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Relational => write!(f, "relational"),
            StoreKind::Cache => write!(f, "cache"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The rate source answered but its rate table has no entry for the
    /// requested currency.
    #[error("exchange rate for {base}-{currency} not available from the rate source")]
    CurrencyNotFound { base: String, currency: String },

    /// The rate source reported a zero, negative or non-finite rate.
    #[error("invalid exchange rate {rate} for {currency}")]
    InvalidRate { currency: String, rate: f64 },

    #[error("amount must be a finite non-negative number, got {0}")]
    InvalidAmount(f64),

    #[error("{0:?} is not a 3-letter currency code")]
    InvalidCurrency(String),

    #[error("target currency must differ from the base currency {0}")]
    SameAsBase(String),

    #[error("rate source request failed")]
    Upstream(#[source] reqwest::Error),

    #[error("rate source returned an unreadable response")]
    UpstreamDecode(#[source] serde_json::Error),

    #[error("write to the {store} store failed")]
    StoreWrite {
        store: StoreKind,
        #[source]
        source: BoxError,
    },

    #[error("read from the {store} store failed")]
    StoreRead {
        store: StoreKind,
        #[source]
        source: BoxError,
    },
}
