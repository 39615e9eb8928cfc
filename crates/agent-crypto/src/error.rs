//! Error types for the crypto report bot

use thiserror::Error;

/// Errors raised by the fetchers, renderers and the bot
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(#[from] agent_utils::ConfigError),

    /// Invalid value passed to a builder
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// LLM provider setup error
    #[error("LLM error: {0}")]
    Llm(#[from] agent_llm::LLMError),

    /// Exa search API error
    #[error("Exa error: {0}")]
    Exa(String),

    /// Alpha Vantage API error
    #[error("Alpha Vantage error: {0}")]
    AlphaVantage(String),

    /// An expected field is absent from a backend response
    #[error(
        "Missing field {field:?} in {source_name} response{}",
        .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
    )]
    MissingField {
        source_name: &'static str,
        field: String,
        detail: Option<String>,
    },

    /// Yahoo Finance error
    #[error("Yahoo Finance error: {0}")]
    Yahoo(String),

    /// Chart drawing error
    #[error("Chart error: {0}")]
    Chart(String),

    /// Telegram Bot API error
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// Prompt template error
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Agent pipeline error
    #[error(transparent)]
    Agent(#[from] agent_core::Error),
}

/// Result type alias for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Tool failures surface to the agent loop as processing errors
impl From<CryptoError> for agent_core::Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Agent(inner) => inner,
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}
