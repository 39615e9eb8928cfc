//! Crypto report bot
//!
//! Given a ticker, three LLM agents (news analyst, price analyst, report
//! writer) produce a one paragraph market report while a 7-day hourly price
//! chart is rendered next to it. The result is delivered over Telegram.
//!
//! # Layout
//!
//! - [`api`]: thin clients for Exa, Alpha Vantage, Yahoo Finance and the Telegram Bot API
//! - [`news`], [`prices`]: fetchers that turn backend data into agent-readable text
//! - [`tools`]: the fetchers exposed as LLM tools (`search_tool`, `price_tool`)
//! - [`crew`]: the three personas and the task graph that chains them
//! - [`chart`]: the 7-day chart renderer and its self-deleting artifact
//! - [`bot`]: command parsing, keyboards, delivery and the polling loop
//! - [`app`]: wiring everything from one [`CryptoConfig`]

pub mod api;
pub mod app;
pub mod bot;
pub mod chart;
pub mod config;
pub mod crew;
pub mod error;
pub mod news;
pub mod prices;
pub mod symbol;
pub mod tools;

pub use app::App;
pub use chart::{ChartArtifact, ChartOutcome, ChartRenderer, MarketChartRenderer};
pub use config::{CryptoConfig, CryptoConfigBuilder};
pub use crew::{AnalysisCrew, ReportGenerator};
pub use error::{CryptoError, Result};
pub use news::{NewsFetcher, NewsRecord, NewsSource};
pub use prices::{DailyBar, MarketDataFetcher, PriceHistorySource, PricePoint};
pub use symbol::Symbol;
