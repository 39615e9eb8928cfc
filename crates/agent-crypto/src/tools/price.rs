//! `price_tool`: daily closing prices for a cryptocurrency

use agent_core::Result as AgentResult;
use agent_tools::{Tool, required_str};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::prices::MarketDataFetcher;
use crate::symbol::Symbol;

pub struct PriceTool {
    fetcher: Arc<MarketDataFetcher>,
}

impl PriceTool {
    pub fn new(fetcher: Arc<MarketDataFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Tool for PriceTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let symbol = Symbol::new(required_str(&params, "symbol")?);
        debug!(symbol = %symbol, "price_tool invoked");

        let text = self.fetcher.fetch_text(&symbol).await?;
        Ok(Value::String(text))
    }

    fn name(&self) -> &str {
        "price_tool"
    }

    fn description(&self) -> &str {
        "Get daily closing price for a given cryptocurrency ticker symbol for the previous 60 days"
    }

    fn input_schema(&self) -> Value {
        super::symbol_schema()
    }
}
