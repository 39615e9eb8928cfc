//! Clients for the external backends

pub mod alpha_vantage;
pub mod exa;
pub mod telegram;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageClient;
pub use exa::ExaClient;
pub use telegram::{ChatTransport, TelegramClient};
pub use yahoo::YahooHourlyClient;
