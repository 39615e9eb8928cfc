//! Ticker symbols

use serde::{Deserialize, Serialize};
use std::fmt;

/// A ticker as given to every backend, e.g. `BTC`
///
/// Symbols are not checked against any registry. Input typed by a user is
/// uppercased; symbols from the menu are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Wrap a symbol verbatim
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Normalize user input (trimmed, uppercased)
    pub fn from_user_input(input: &str) -> Self {
        Self(input.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_input_is_uppercased() {
        assert_eq!(Symbol::from_user_input(" doge ").as_str(), "DOGE");
    }

    #[test]
    fn test_verbatim() {
        let symbol = Symbol::new("btc-usd");
        assert_eq!(symbol.to_string(), "btc-usd");
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"btc-usd\"");
    }
}
