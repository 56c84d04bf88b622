//! Rate fetcher for the OpenExchangeRates `latest.json` API.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Error;
use crate::model::RateQuote;
use crate::rate_provider::RateProvider;

pub struct OpenExchangeRatesProvider {
    base_url: String,
    app_id: String,
    client: reqwest::Client,
}

impl OpenExchangeRatesProvider {
    pub fn new(base_url: &str, app_id: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxrates/0.1")
            .timeout(timeout)
            .build()?;
        Ok(OpenExchangeRatesProvider {
            base_url: base_url.to_string(),
            app_id: app_id.to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    base: String,
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    async fn fetch_rate(&self, currency: &str) -> Result<RateQuote, Error> {
        let url = format!(
            "{}/api/latest.json?app_id={}",
            self.base_url, self.app_id
        );
        debug!("Requesting latest rates from {}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Error::Upstream)?;

        let response = response.error_for_status().map_err(Error::Upstream)?;
        let text = response.text().await.map_err(Error::Upstream)?;
        let latest: LatestResponse =
            serde_json::from_str(&text).map_err(Error::UpstreamDecode)?;

        let Some(rate) = latest.rates.get(currency).copied() else {
            warn!(
                "Exchange rate for {} - {} not available in API",
                latest.base, currency
            );
            return Err(Error::CurrencyNotFound {
                base: latest.base,
                currency: currency.to_string(),
            });
        };

        debug!("Fetched rate {} for {}", rate, currency);
        Ok(RateQuote {
            timestamp: Utc::now().timestamp(),
            base: latest.base,
            currency: currency.to_string(),
            rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/latest.json"))
            .and(query_param("app_id", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(base_url: &str) -> OpenExchangeRatesProvider {
        OpenExchangeRatesProvider::new(base_url, "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "base": "USD",
            "rates": {
                "GBP": 0.77405,
                "EUR": 0.886964,
                "RUB": 65.4583
            }
        }"#;

        let mock_server = create_mock_server(mock_response).await;
        let quote = provider(&mock_server.uri()).fetch_rate("RUB").await.unwrap();

        assert_eq!(quote.base, "USD");
        assert_eq!(quote.currency, "RUB");
        assert_eq!(quote.rate, 65.4583);
        assert!(quote.timestamp > 0);
    }

    #[tokio::test]
    async fn test_missing_currency_is_explicit() {
        let mock_response = r#"{"base": "USD", "rates": {"EUR": 0.886964}}"#;

        let mock_server = create_mock_server(mock_response).await;
        let result = provider(&mock_server.uri()).fetch_rate("XXX").await;

        match result {
            Err(Error::CurrencyNotFound { base, currency }) => {
                assert_eq!(base, "USD");
                assert_eq!(currency, "XXX");
            }
            other => panic!("expected CurrencyNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upstream_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/latest.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch_rate("EUR").await;
        assert!(matches!(result, Err(Error::Upstream(_))));
    }

    #[tokio::test]
    async fn test_slow_upstream_hits_the_bounded_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/latest.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"base": "USD", "rates": {"EUR": 0.886964}}"#)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let provider = OpenExchangeRatesProvider::new(
            &mock_server.uri(),
            "test-key",
            Duration::from_millis(100),
        )
        .unwrap();

        let result = provider.fetch_rate("EUR").await;
        assert!(matches!(result, Err(Error::Upstream(_))));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"base": "USD", "rate_table": {}}"#;

        let mock_server = create_mock_server(mock_response).await;
        let result = provider(&mock_server.uri()).fetch_rate("EUR").await;
        assert!(matches!(result, Err(Error::UpstreamDecode(_))));
    }
}
