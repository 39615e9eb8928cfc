//! Wiring of every service from one configuration

use agent_llm::providers::GeminiProvider;
use agent_runtime::{AgentRuntime, StepThrottle};
use std::sync::Arc;
use tracing::info;

use crate::api::{AlphaVantageClient, ExaClient, TelegramClient, YahooHourlyClient};
use crate::bot::CryptoBot;
use crate::chart::MarketChartRenderer;
use crate::config::CryptoConfig;
use crate::crew::AnalysisCrew;
use crate::error::Result;
use crate::news::NewsFetcher;
use crate::prices::MarketDataFetcher;
use crate::tools::{PriceTool, SearchTool};

/// Alpha Vantage free tier allowance
const ALPHA_VANTAGE_RPM: u32 = 5;

/// The assembled application
pub struct App {
    config: Arc<CryptoConfig>,
    telegram: Arc<TelegramClient>,
    crew: Arc<AnalysisCrew>,
    charts: Arc<MarketChartRenderer>,
}

impl App {
    pub fn from_config(config: Arc<CryptoConfig>) -> Result<Self> {
        let provider =
            GeminiProvider::with_timeout(config.gemini_api_key.clone(), config.llm_timeout)?;
        let throttle = Arc::new(StepThrottle::new(config.max_rpm, config.step_delay));
        let runtime = AgentRuntime::builder()
            .provider(Arc::new(provider))
            .throttle(throttle)
            .default_model(config.gemini_model.clone())
            .temperature(config.temperature)
            .build()?;

        let exa = ExaClient::new(config.exa_api_key.clone(), config.http_timeout)?;
        let news = NewsFetcher::new(Arc::new(exa)).with_limit(config.news_limit);

        let alpha_vantage = AlphaVantageClient::new(
            config.alpha_vantage_api_key.clone(),
            ALPHA_VANTAGE_RPM,
            config.http_timeout,
        )?;
        let prices = MarketDataFetcher::new(Arc::new(alpha_vantage))
            .with_days(config.price_window_days, config.price_output_days);

        let crew = AnalysisCrew::new(
            &runtime,
            Arc::new(SearchTool::new(Arc::new(news))),
            Arc::new(PriceTool::new(Arc::new(prices))),
            config.max_iterations,
        )?;

        let charts = MarketChartRenderer::new(Arc::new(YahooHourlyClient::new()), &config.chart_dir)
            .with_font(config.chart_font_path.clone());

        let telegram = TelegramClient::new(&config.bot_token, config.http_timeout)?;

        info!(
            model = %config.gemini_model,
            max_rpm = config.max_rpm,
            step_delay_secs = config.step_delay.as_secs(),
            chart_dir = %config.chart_dir.display(),
            "Application assembled"
        );

        Ok(Self {
            config,
            telegram: Arc::new(telegram),
            crew: Arc::new(crew),
            charts: Arc::new(charts),
        })
    }

    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    pub fn crew(&self) -> &Arc<AnalysisCrew> {
        &self.crew
    }

    pub fn charts(&self) -> &Arc<MarketChartRenderer> {
        &self.charts
    }

    pub fn bot(&self) -> CryptoBot {
        CryptoBot::new(self.telegram.clone(), self.crew.clone(), self.charts.clone())
    }

    /// Run the Telegram bot until Ctrl-C
    pub async fn serve(&self) -> Result<()> {
        Arc::new(self.bot())
            .run_polling(self.telegram.clone(), self.config.poll_timeout_secs)
            .await
    }
}
