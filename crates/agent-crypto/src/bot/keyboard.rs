//! Inline keyboards

use crate::api::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Tickers offered in the selection menu
pub const TICKERS: [&str; 4] = ["BTC", "ETH", "SOL", "DOGE"];

pub const TICKER_PREFIX: &str = "ticker_";
pub const GO_BACK: &str = "go_back";

/// One button per ticker, one ticker per row
pub fn ticker_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: TICKERS
            .iter()
            .map(|t| vec![InlineKeyboardButton::callback(*t, format!("{TICKER_PREFIX}{t}"))])
            .collect(),
    }
}

/// Single button returning to the selection menu
pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::callback("🔙 Back", GO_BACK)]],
    }
}
