use async_trait::async_trait;

use crate::error::Error;
use crate::model::RateQuote;

/// Seam for the external rate source. One outbound call per invocation, no
/// caching and no retry; a currency missing from the source's rate table is
/// [`Error::CurrencyNotFound`], never a silent empty result.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rate(&self, currency: &str) -> Result<RateQuote, Error>;
}
