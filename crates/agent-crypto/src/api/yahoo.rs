//! Yahoo Finance hourly quotes

use crate::chart::{HourlySample, HourlySeriesSource};
use crate::error::{CryptoError, Result};
use crate::symbol::Symbol;
use async_trait::async_trait;
use chrono::DateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Hourly quotes over a trailing range
#[derive(Debug, Clone)]
pub struct YahooHourlyClient {
    interval: String,
    range: String,
}

impl Default for YahooHourlyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooHourlyClient {
    /// One sample per hour over the last 7 days
    pub fn new() -> Self {
        Self {
            interval: "1h".to_string(),
            range: "7d".to_string(),
        }
    }

    /// Closing prices with a finite value, oldest first
    pub async fn hourly_closes(&self, symbol: &str) -> Result<Vec<HourlySample>> {
        let provider =
            yahoo::YahooConnector::new().map_err(|e| CryptoError::Yahoo(e.to_string()))?;

        let response = provider
            .get_quote_range(symbol, &self.interval, &self.range)
            .await
            .map_err(|e| CryptoError::Yahoo(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| CryptoError::Yahoo(e.to_string()))?;

        let mut samples: Vec<HourlySample> = quotes
            .iter()
            .filter(|q| q.close.is_finite())
            .filter_map(|q| {
                DateTime::from_timestamp(q.timestamp as i64, 0).map(|timestamp| HourlySample {
                    timestamp,
                    close: q.close,
                })
            })
            .collect();
        samples.sort_by_key(|s| s.timestamp);

        debug!(symbol, samples = samples.len(), "Yahoo hourly quotes fetched");
        Ok(samples)
    }
}

#[async_trait]
impl HourlySeriesSource for YahooHourlyClient {
    async fn hourly_series(&self, symbol: &Symbol) -> Result<Vec<HourlySample>> {
        self.hourly_closes(symbol.as_str()).await
    }
}
