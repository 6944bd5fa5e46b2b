//! HTTP quote provider adapter.
//!
//! Fetches current quotes from an IEX-style JSON endpoint:
//! `GET {base_url}/stock/{symbol}/quote?token={api_key}`. Every failure mode
//! at lookup time collapses to `InvalidSymbol`: the engine treats an unknown
//! ticker and a provider outage the same way.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::error::PapertradeError;
use crate::domain::quote::Quote;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;

const DEFAULT_BASE_URL: &str = "https://cloud.iexapis.com/stable";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of the provider's quote endpoint.
#[derive(Debug, Deserialize)]
pub struct QuoteResponse {
    #[serde(rename = "companyName")]
    pub company_name: String,
    pub symbol: String,
    #[serde(rename = "latestPrice")]
    pub latest_price: f64,
}

pub struct HttpQuoteAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpQuoteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertradeError> {
        let api_key =
            config
                .get_string("quote", "api_key")
                .ok_or_else(|| PapertradeError::ConfigMissing {
                    section: "quote".into(),
                    key: "api_key".into(),
                })?;

        let base_url = config
            .get_string("quote", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PapertradeError::QuoteProvider {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

/// Validate a provider response into a domain quote.
///
/// A non-positive or non-finite price is treated the same as an unknown
/// symbol; nothing downstream ever sees a quote the engine cannot trade at.
fn quote_from_response(symbol: &str, body: QuoteResponse) -> Result<Quote, PapertradeError> {
    if !body.latest_price.is_finite() || body.latest_price <= 0.0 {
        return Err(PapertradeError::InvalidSymbol {
            symbol: symbol.to_string(),
        });
    }
    Ok(Quote {
        name: body.company_name,
        symbol: body.symbol,
        price: body.latest_price,
    })
}

#[async_trait]
impl QuotePort for HttpQuoteAdapter {
    async fn lookup(&self, symbol: &str) -> Result<Quote, PapertradeError> {
        let url = format!(
            "{}/stock/{}/quote",
            self.base_url.trim_end_matches('/'),
            symbol
        );

        let invalid = || PapertradeError::InvalidSymbol {
            symbol: symbol.to_string(),
        };

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                log::warn!("quote request for {symbol} failed: {e}");
                invalid()
            })?;

        if !response.status().is_success() {
            log::warn!("quote request for {symbol} returned {}", response.status());
            return Err(invalid());
        }

        let body: QuoteResponse = response.json().await.map_err(|e| {
            log::warn!("quote response for {symbol} was malformed: {e}");
            invalid()
        })?;

        quote_from_response(symbol, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    #[test]
    fn from_config_requires_api_key() {
        let result = HttpQuoteAdapter::from_config(&EmptyConfig);
        match result {
            Err(PapertradeError::ConfigMissing { section, key }) => {
                assert_eq!(section, "quote");
                assert_eq!(key, "api_key");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn provider_body_deserializes() {
        let body: QuoteResponse = serde_json::from_str(
            r#"{"companyName": "Netflix, Inc.", "symbol": "NFLX", "latestPrice": 645.12}"#,
        )
        .unwrap();
        let quote = quote_from_response("NFLX", body).unwrap();
        assert_eq!(quote.name, "Netflix, Inc.");
        assert_eq!(quote.symbol, "NFLX");
        assert_abs_diff_eq!(quote.price, 645.12);
    }

    #[test]
    fn non_positive_price_is_rejected() {
        for price in ["0.0", "-4.2"] {
            let body: QuoteResponse = serde_json::from_str(&format!(
                r#"{{"companyName": "X", "symbol": "X", "latestPrice": {price}}}"#
            ))
            .unwrap();
            let err = quote_from_response("X", body).unwrap_err();
            assert!(matches!(err, PapertradeError::InvalidSymbol { .. }));
        }
    }
}
