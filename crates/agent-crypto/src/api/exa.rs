//! Exa search API client

use crate::error::{CryptoError, Result};
use crate::news::{NewsRecord, NewsSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.exa.ai";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    contents: SearchContents,
}

#[derive(Debug, Serialize)]
struct SearchContents {
    summary: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<NewsRecord>,
}

/// Exa search client
///
/// Queries are free text; results come back in relevance order, each with
/// an LLM-written summary of the page.
#[derive(Debug, Clone)]
pub struct ExaClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ExaClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (used against local fakes)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run a search and return the raw result records
    pub async fn search(&self, query: &str) -> Result<Vec<NewsRecord>> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let body = SearchRequest {
            query,
            contents: SearchContents { summary: true },
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CryptoError::Exa(format!("HTTP {status}: {text}")));
        }

        let parsed: SearchResponse = response.json().await?;
        debug!(query, results = parsed.results.len(), "Exa search completed");
        Ok(parsed.results)
    }
}

#[async_trait]
impl NewsSource for ExaClient {
    async fn search(&self, query: &str) -> Result<Vec<NewsRecord>> {
        ExaClient::search(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = SearchRequest {
            query: "BTC",
            contents: SearchContents { summary: true },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"query": "BTC", "contents": {"summary": true}})
        );
    }

    #[test]
    fn test_response_with_partial_records() {
        let raw = r#"{
            "requestId": "r1",
            "results": [
                {"title": "BTC rallies", "url": "https://a.example", "publishedDate": "2026-10-14", "score": 0.91},
                {"id": "abc"}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].title(), "BTC rallies");
        assert_eq!(parsed.results[0].published_date(), "2026-10-14");
        assert_eq!(parsed.results[1].url(), "#");
        assert_eq!(parsed.results[1].summary(), "No Summary");
    }

    #[test]
    fn test_response_without_results() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
