//! Daily price history and the fetcher behind `price_tool`

use crate::error::Result;
use crate::symbol::Symbol;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// One day of market data as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Closing price of one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl From<&DailyBar> for PricePoint {
    fn from(bar: &DailyBar) -> Self {
        Self {
            date: bar.date,
            close: bar.close,
        }
    }
}

impl PricePoint {
    /// `YYYY-MM-DD - 12345.68`
    pub fn format_line(&self) -> String {
        format!("{} - {:.2}", self.date.format("%Y-%m-%d"), self.close)
    }
}

/// A backend with daily digital-currency bars quoted in USD
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// All available days, in no particular order
    async fn daily_bars(&self, symbol: &Symbol) -> Result<Vec<DailyBar>>;
}

/// Selects and formats the price history handed to the price analyst
pub struct MarketDataFetcher {
    source: Arc<dyn PriceHistorySource>,
    window_days: usize,
    output_days: usize,
}

impl MarketDataFetcher {
    /// Fetcher with a 60 day window, emitting 30 days
    pub fn new(source: Arc<dyn PriceHistorySource>) -> Self {
        Self {
            source,
            window_days: 60,
            output_days: 30,
        }
    }

    pub fn with_days(mut self, window_days: usize, output_days: usize) -> Self {
        self.window_days = window_days;
        self.output_days = output_days;
        self
    }

    /// Price points selected from the backend history
    pub async fn fetch(&self, symbol: &Symbol) -> Result<Vec<PricePoint>> {
        let bars = self.source.daily_bars(symbol).await?;
        let total = bars.len();
        let points = select_points(&bars, self.window_days, self.output_days);
        info!(
            symbol = %symbol,
            total,
            emitted = points.len(),
            first = ?points.first().map(|p| p.date),
            last = ?points.last().map(|p| p.date),
            "Price history fetched"
        );
        Ok(points)
    }

    /// Selected points as newline separated text
    pub async fn fetch_text(&self, symbol: &Symbol) -> Result<String> {
        let points = self.fetch(symbol).await?;
        Ok(points
            .iter()
            .map(PricePoint::format_line)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Sort ascending, keep the latest `window` days, emit the earliest `output`
/// days of that window
pub fn select_points(bars: &[DailyBar], window: usize, output: usize) -> Vec<PricePoint> {
    let mut points: Vec<PricePoint> = bars.iter().map(PricePoint::from).collect();
    points.sort_by_key(|p| p.date);

    let start = points.len().saturating_sub(window);
    points.drain(..start);
    points.truncate(output);
    points
}
