//! `search_tool`: latest news for a cryptocurrency

use agent_core::Result as AgentResult;
use agent_tools::{Tool, required_str};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::news::NewsFetcher;
use crate::symbol::Symbol;

pub struct SearchTool {
    fetcher: Arc<NewsFetcher>,
}

impl SearchTool {
    pub fn new(fetcher: Arc<NewsFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Tool for SearchTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let symbol = Symbol::new(required_str(&params, "symbol")?);
        debug!(symbol = %symbol, "search_tool invoked");

        let text = self.fetcher.fetch_text(&symbol).await?;
        Ok(Value::String(text))
    }

    fn name(&self) -> &str {
        "search_tool"
    }

    fn description(&self) -> &str {
        "Search for the latest news and provide a summary about a given query using Exa."
    }

    fn input_schema(&self) -> Value {
        super::symbol_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::{MockNewsSource, NO_RESULTS, NewsRecord};
    use serde_json::json;

    fn tool(records: Vec<NewsRecord>) -> SearchTool {
        let mut source = MockNewsSource::new();
        source
            .expect_search()
            .withf(|query| query == "SOL")
            .returning(move |_| Ok(records.clone()));
        SearchTool::new(Arc::new(NewsFetcher::new(Arc::new(source))))
    }

    #[tokio::test]
    async fn test_returns_formatted_news() {
        let record = NewsRecord {
            title: Some("SOL upgrade ships".into()),
            ..Default::default()
        };
        let out = tool(vec![record])
            .execute(json!({"symbol": "SOL"}))
            .await
            .unwrap();
        assert_eq!(
            out,
            json!("Title: SOL upgrade ships\nURL: #\nSummary: No Summary\n")
        );
    }

    #[tokio::test]
    async fn test_no_results_is_not_an_error() {
        let out = tool(Vec::new())
            .execute(json!({"symbol": "SOL"}))
            .await
            .unwrap();
        assert_eq!(out, json!(NO_RESULTS));
    }

    #[tokio::test]
    async fn test_missing_symbol() {
        let source = MockNewsSource::new();
        let tool = SearchTool::new(Arc::new(NewsFetcher::new(Arc::new(source))));
        assert!(tool.execute(json!({})).await.is_err());
    }

    #[test]
    fn test_definition() {
        let def = tool(Vec::new()).definition();
        assert_eq!(def.name, "search_tool");
        assert_eq!(def.input_schema["required"], json!(["symbol"]));
    }
}
