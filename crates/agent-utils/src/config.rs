//! Helpers for reading configuration from the process environment

use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set (or is blank)
    #[error("{0} environment variable not set")]
    Missing(String),

    /// A variable is set but cannot be parsed
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        name: String,
        value: String,
    },
}

/// Read a required variable. Blank values count as missing.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Read an optional variable, falling back to `default` when unset or blank
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse an optional variable
///
/// Unset or blank yields `default`; a value that does not parse is an error
/// rather than a silent fallback.
pub fn env_parse_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: name.to_string(),
                value: raw,
            })
        }
        _ => Ok(default),
    }
}
