//! Configuration for the crypto report bot
//!
//! Built once at start, either from the environment or through the builder,
//! and shared by `Arc` with every component.

use crate::error::{CryptoError, Result};
use agent_utils::{LogFormat, env_or, env_parse_or, require_env};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Everything the bot needs to run
#[derive(Clone)]
pub struct CryptoConfig {
    /// Telegram bot token (`BOT_API`)
    pub bot_token: String,

    /// Gemini API key (`GEMINI_API`)
    pub gemini_api_key: String,

    /// Exa API key (`EXA_API`)
    pub exa_api_key: String,

    /// Alpha Vantage API key (`ALPHA_API`)
    pub alpha_vantage_api_key: String,

    pub gemini_model: String,

    /// Directory chart images are written to
    pub chart_dir: PathBuf,

    /// TrueType font used for chart labels; without one the chart has no text
    pub chart_font_path: Option<PathBuf>,

    /// Pause after every agent step
    pub step_delay: Duration,

    /// LLM calls per minute, shared by all agents (0 disables the cap)
    pub max_rpm: u32,

    /// Timeout for the Exa, Alpha Vantage and Telegram clients
    pub http_timeout: Duration,

    /// Timeout for a single LLM completion
    pub llm_timeout: Duration,

    /// Iteration bound of each agent
    pub max_iterations: usize,

    pub temperature: f32,

    /// Number of news records handed to the news analyst
    pub news_limit: usize,

    /// Days of price history considered
    pub price_window_days: usize,

    /// Days of price history emitted to the price analyst
    pub price_output_days: usize,

    /// Long-poll timeout for `getUpdates`
    pub poll_timeout_secs: u64,

    pub log_format: LogFormat,
}

impl CryptoConfig {
    /// Create a new configuration builder
    pub fn builder() -> CryptoConfigBuilder {
        CryptoConfigBuilder::default()
    }

    /// Load the configuration from environment variables
    ///
    /// `BOT_API`, `GEMINI_API`, `EXA_API` and `ALPHA_API` are required.
    /// Optional: `GEMINI_MODEL`, `CHART_DIR`, `CHART_FONT_PATH`,
    /// `STEP_DELAY_SECS`, `MAX_RPM`, `HTTP_TIMEOUT_SECS`, `LOG_FORMAT`.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder()
            .bot_token(require_env("BOT_API")?)
            .gemini_api_key(require_env("GEMINI_API")?)
            .exa_api_key(require_env("EXA_API")?)
            .alpha_vantage_api_key(require_env("ALPHA_API")?)
            .gemini_model(env_or("GEMINI_MODEL", DEFAULT_MODEL))
            .step_delay(Duration::from_secs(env_parse_or("STEP_DELAY_SECS", 5)?))
            .max_rpm(env_parse_or("MAX_RPM", 15)?)
            .http_timeout(Duration::from_secs(env_parse_or("HTTP_TIMEOUT_SECS", 30)?))
            .log_format(env_parse_or("LOG_FORMAT", LogFormat::Text)?);

        let chart_dir = env_or("CHART_DIR", "");
        if !chart_dir.is_empty() {
            builder = builder.chart_dir(chart_dir);
        }
        let font = env_or("CHART_FONT_PATH", "");
        if !font.is_empty() {
            builder = builder.chart_font_path(font);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("bot_token", &self.bot_token),
            ("gemini_api_key", &self.gemini_api_key),
            ("exa_api_key", &self.exa_api_key),
            ("alpha_vantage_api_key", &self.alpha_vantage_api_key),
        ] {
            if value.trim().is_empty() {
                return Err(CryptoError::InvalidConfig(format!("{name} must not be empty")));
            }
        }

        if self.max_iterations == 0 {
            return Err(CryptoError::InvalidConfig(
                "max_iterations must be greater than 0".to_string(),
            ));
        }

        if self.price_output_days == 0 || self.price_output_days > self.price_window_days {
            return Err(CryptoError::InvalidConfig(format!(
                "price_output_days must be between 1 and price_window_days ({})",
                self.price_window_days
            )));
        }

        if self.news_limit == 0 {
            return Err(CryptoError::InvalidConfig(
                "news_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        f.debug_struct("CryptoConfig")
            .field("bot_token", &REDACTED)
            .field("gemini_api_key", &REDACTED)
            .field("exa_api_key", &REDACTED)
            .field("alpha_vantage_api_key", &REDACTED)
            .field("gemini_model", &self.gemini_model)
            .field("chart_dir", &self.chart_dir)
            .field("chart_font_path", &self.chart_font_path)
            .field("step_delay", &self.step_delay)
            .field("max_rpm", &self.max_rpm)
            .field("http_timeout", &self.http_timeout)
            .field("llm_timeout", &self.llm_timeout)
            .field("max_iterations", &self.max_iterations)
            .field("temperature", &self.temperature)
            .field("news_limit", &self.news_limit)
            .field("price_window_days", &self.price_window_days)
            .field("price_output_days", &self.price_output_days)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Builder for CryptoConfig
#[derive(Debug, Default)]
pub struct CryptoConfigBuilder {
    bot_token: Option<String>,
    gemini_api_key: Option<String>,
    exa_api_key: Option<String>,
    alpha_vantage_api_key: Option<String>,
    gemini_model: Option<String>,
    chart_dir: Option<PathBuf>,
    chart_font_path: Option<PathBuf>,
    step_delay: Option<Duration>,
    max_rpm: Option<u32>,
    http_timeout: Option<Duration>,
    llm_timeout: Option<Duration>,
    max_iterations: Option<usize>,
    temperature: Option<f32>,
    news_limit: Option<usize>,
    price_window_days: Option<usize>,
    price_output_days: Option<usize>,
    poll_timeout_secs: Option<u64>,
    log_format: Option<LogFormat>,
}

impl CryptoConfigBuilder {
    pub fn bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }

    pub fn exa_api_key(mut self, key: impl Into<String>) -> Self {
        self.exa_api_key = Some(key.into());
        self
    }

    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    /// Set the Gemini model
    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = Some(model.into());
        self
    }

    /// Set the chart output directory
    pub fn chart_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chart_dir = Some(dir.into());
        self
    }

    /// Set the font used for chart labels
    pub fn chart_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chart_font_path = Some(path.into());
        self
    }

    /// Set the pause after every agent step
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Set the LLM calls-per-minute cap
    pub fn max_rpm(mut self, rpm: u32) -> Self {
        self.max_rpm = Some(rpm);
        self
    }

    /// Set the HTTP request timeout
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = Some(timeout);
        self
    }

    /// Set the iteration bound of each agent
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn news_limit(mut self, limit: usize) -> Self {
        self.news_limit = Some(limit);
        self
    }

    /// Set the price window and the number of days emitted from it
    pub fn price_days(mut self, window: usize, output: usize) -> Self {
        self.price_window_days = Some(window);
        self.price_output_days = Some(output);
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = Some(secs);
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CryptoConfig> {
        let config = CryptoConfig {
            bot_token: self.bot_token.unwrap_or_default(),
            gemini_api_key: self.gemini_api_key.unwrap_or_default(),
            exa_api_key: self.exa_api_key.unwrap_or_default(),
            alpha_vantage_api_key: self.alpha_vantage_api_key.unwrap_or_default(),
            gemini_model: self
                .gemini_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            chart_dir: self.chart_dir.unwrap_or_else(std::env::temp_dir),
            chart_font_path: self.chart_font_path,
            step_delay: self.step_delay.unwrap_or(Duration::from_secs(5)),
            max_rpm: self.max_rpm.unwrap_or(15),
            http_timeout: self.http_timeout.unwrap_or(Duration::from_secs(30)),
            llm_timeout: self.llm_timeout.unwrap_or(Duration::from_secs(120)),
            max_iterations: self.max_iterations.unwrap_or(5),
            temperature: self.temperature.unwrap_or(0.7),
            news_limit: self.news_limit.unwrap_or(5),
            price_window_days: self.price_window_days.unwrap_or(60),
            price_output_days: self.price_output_days.unwrap_or(30),
            poll_timeout_secs: self.poll_timeout_secs.unwrap_or(30),
            log_format: self.log_format.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
