//! Alpha Vantage API client

use crate::error::{CryptoError, Result};
use crate::prices::{DailyBar, PriceHistorySource};
use crate::symbol::Symbol;
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Key holding the daily series in a `DIGITAL_CURRENCY_DAILY` response
pub const DAILY_SERIES_KEY: &str = "Time Series (Digital Currency Daily)";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

impl AlphaVantageClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (5 on the free tier)
    /// * `timeout` - HTTP request timeout
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Daily bars of a digital currency quoted in USD
    pub async fn digital_currency_daily(&self, symbol: &str) -> Result<Vec<DailyBar>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "DIGITAL_CURRENCY_DAILY"),
                ("symbol", symbol),
                ("market", "USD"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CryptoError::AlphaVantage(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: Value = response.json().await?;
        let bars = parse_daily_series(&data)?;
        debug!(symbol, days = bars.len(), "Alpha Vantage daily series parsed");
        Ok(bars)
    }
}

#[async_trait]
impl PriceHistorySource for AlphaVantageClient {
    async fn daily_bars(&self, symbol: &Symbol) -> Result<Vec<DailyBar>> {
        self.digital_currency_daily(symbol.as_str()).await
    }
}

/// Parse a `DIGITAL_CURRENCY_DAILY` payload
///
/// Without the series key the call failed; whatever explanation the API gave
/// is carried in the error.
pub fn parse_daily_series(data: &Value) -> Result<Vec<DailyBar>> {
    let Some(series) = data.get(DAILY_SERIES_KEY).and_then(Value::as_object) else {
        let detail = ["Error Message", "Note", "Information"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str))
            .map(str::to_string);
        return Err(CryptoError::MissingField {
            source_name: "Alpha Vantage",
            field: DAILY_SERIES_KEY.to_string(),
            detail,
        });
    };

    let mut bars = Vec::with_capacity(series.len());
    for (day, values) in series {
        let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
            warn!(day, "Skipping day with unparseable date");
            continue;
        };
        let Some(close) = number(values, &["4. close", "4a. close (USD)"]) else {
            warn!(day, "Skipping day without a close price");
            continue;
        };

        bars.push(DailyBar {
            date,
            open: number(values, &["1. open", "1a. open (USD)"]).unwrap_or(0.0),
            high: number(values, &["2. high", "2a. high (USD)"]).unwrap_or(0.0),
            low: number(values, &["3. low", "3a. low (USD)"]).unwrap_or(0.0),
            close,
            volume: number(values, &["5. volume"]).unwrap_or(0.0),
        });
    }

    Ok(bars)
}

/// First of `keys` present as a numeric string
fn number(values: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| values.get(*key).and_then(Value::as_str))
        .and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_parse_current_layout() {
        let data = json!({
            "Meta Data": {"2. Digital Currency Code": "BTC"},
            "Time Series (Digital Currency Daily)": {
                "2026-10-14": {
                    "1. open": "62000.10", "2. high": "63000.00", "3. low": "61000.00",
                    "4. close": "62500.55", "5. volume": "1234.5"
                },
                "2026-10-13": {
                    "1. open": "61000.00", "2. high": "62100.00", "3. low": "60000.00",
                    "4. close": "62000.10", "5. volume": "999"
                }
            }
        });

        let mut bars = assert_ok!(parse_daily_series(&data));
        bars.sort_by_key(|b| b.date);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
        assert!((bars[1].close - 62_500.55).abs() < 1e-9);
        assert!((bars[0].volume - 999.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_legacy_close_key() {
        let data = json!({
            "Time Series (Digital Currency Daily)": {
                "2024-01-02": {"4a. close (USD)": "45000.00", "5. volume": "10"}
            }
        });
        let bars = parse_daily_series(&data).unwrap();
        assert!((bars[0].close - 45_000.0).abs() < 1e-9);
        assert!(bars[0].open.abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_series_carries_api_message() {
        let data = json!({"Error Message": "Invalid API call. Please retry or visit the documentation"});
        let err = assert_err!(parse_daily_series(&data));
        match err {
            CryptoError::MissingField { field, detail, .. } => {
                assert_eq!(field, DAILY_SERIES_KEY);
                assert!(detail.unwrap().starts_with("Invalid API call"));
            }
            other => panic!("Expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_note_is_detail() {
        let data = json!({"Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."});
        let err = parse_daily_series(&data).unwrap_err();
        assert!(err.to_string().contains("25 requests per day"));
    }

    #[test]
    fn test_days_without_close_are_skipped() {
        let data = json!({
            "Time Series (Digital Currency Daily)": {
                "2026-10-14": {"1. open": "1"},
                "not-a-date": {"4. close": "1"},
                "2026-10-13": {"4. close": "2.5"}
            }
        });
        let bars = parse_daily_series(&data).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2026, 10, 13).unwrap());
    }

    #[test]
    fn test_client_builds() {
        let client = AlphaVantageClient::new("demo", 0, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, BASE_URL);
    }
}
