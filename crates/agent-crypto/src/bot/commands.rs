//! Parsing of chat commands and button callbacks

use super::keyboard::{GO_BACK, TICKER_PREFIX};
use crate::symbol::Symbol;

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`: show the selection menu
    Start,
    /// `/custom SYMBOL`
    Custom { symbol: Symbol },
    /// `/custom` with other than exactly one argument
    CustomUsage,
    /// A ticker button was pressed
    Ticker { symbol: Symbol },
    /// The back button was pressed
    GoBack,
}

impl Command {
    /// Parse the text of a chat message
    ///
    /// Anything that is not a known command yields `None` and is ignored.
    pub fn parse_text(input: &str) -> Option<Self> {
        let input = input.trim();
        let rest = input.strip_prefix('/')?;

        let mut parts = rest.split_whitespace();
        let head = parts.next()?;
        // "/custom@SomeBot BTC" in group chats
        let cmd = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<&str> = parts.collect();

        match cmd.as_str() {
            "start" => Some(Self::Start),
            "custom" => match args.as_slice() {
                [symbol] => Some(Self::Custom {
                    symbol: Symbol::from_user_input(symbol),
                }),
                _ => Some(Self::CustomUsage),
            },
            _ => None,
        }
    }

    /// Parse the data attached to an inline button
    ///
    /// `ticker_<SYM>` keeps the symbol verbatim, up to the next underscore.
    pub fn parse_callback(data: &str) -> Option<Self> {
        if data == GO_BACK {
            return Some(Self::GoBack);
        }

        let symbol = data.strip_prefix(TICKER_PREFIX)?.split('_').next()?;
        if symbol.is_empty() {
            return None;
        }
        Some(Self::Ticker {
            symbol: Symbol::new(symbol),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start() {
        assert_eq!(Command::parse_text("/start"), Some(Command::Start));
        assert_eq!(Command::parse_text("/start@CryAssBot"), Some(Command::Start));
    }

    #[test]
    fn test_custom_uppercases() {
        assert_eq!(
            Command::parse_text("/custom doge"),
            Some(Command::Custom {
                symbol: Symbol::new("DOGE")
            })
        );
    }

    #[test]
    fn test_custom_wrong_arity() {
        assert_eq!(Command::parse_text("/custom"), Some(Command::CustomUsage));
        assert_eq!(Command::parse_text("/custom A B"), Some(Command::CustomUsage));
    }

    #[test]
    fn test_plain_text_ignored() {
        assert_eq!(Command::parse_text("hello"), None);
        assert_eq!(Command::parse_text("/help"), None);
        assert_eq!(Command::parse_text("/"), None);
    }

    #[test]
    fn test_callbacks() {
        assert_eq!(Command::parse_callback("go_back"), Some(Command::GoBack));
        assert_eq!(
            Command::parse_callback("ticker_BTC"),
            Some(Command::Ticker {
                symbol: Symbol::new("BTC")
            })
        );
        assert_eq!(
            Command::parse_callback("ticker_SOL_extra"),
            Some(Command::Ticker {
                symbol: Symbol::new("SOL")
            })
        );
        assert_eq!(Command::parse_callback("ticker_"), None);
        assert_eq!(Command::parse_callback("unknown"), None);
    }
}
