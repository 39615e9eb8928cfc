//! News records and the fetcher behind `search_tool`

use crate::error::Result;
use crate::symbol::Symbol;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Text returned when a search yields nothing
pub const NO_RESULTS: &str = "No results found.";

/// One search hit, any field of which may be absent
///
/// Placeholders for absent fields are applied by the accessors only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRecord {
    pub title: Option<String>,
    pub url: Option<String>,
    pub id: Option<String>,
    pub score: Option<f64>,
    pub published_date: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub summary: Option<String>,
}

impl NewsRecord {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("No Title")
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or("#")
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("#")
    }

    pub fn score(&self) -> String {
        self.score
            .map_or_else(|| "No Score".to_string(), |score| score.to_string())
    }

    pub fn published_date(&self) -> &str {
        self.published_date.as_deref().unwrap_or("Unknown Date")
    }

    pub fn author(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown Author")
    }

    pub fn image(&self) -> &str {
        self.image.as_deref().unwrap_or("No Image")
    }

    pub fn favicon(&self) -> &str {
        self.favicon.as_deref().unwrap_or("No Favicon")
    }

    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or("No Summary")
    }

    /// Text block handed to the news analyst
    pub fn format_block(&self) -> String {
        format!(
            "Title: {}\nURL: {}\nSummary: {}\n",
            self.title(),
            self.url(),
            self.summary()
        )
    }
}

/// A backend that answers free-text news queries in relevance order
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<NewsRecord>>;
}

/// Fetches the most relevant news for a symbol
pub struct NewsFetcher {
    source: Arc<dyn NewsSource>,
    limit: usize,
}

impl NewsFetcher {
    pub fn new(source: Arc<dyn NewsSource>) -> Self {
        Self { source, limit: 5 }
    }

    /// Keep at most `limit` records
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Up to `limit` records, in the order the backend ranked them
    pub async fn fetch(&self, symbol: &Symbol) -> Result<Vec<NewsRecord>> {
        let mut records = self.source.search(symbol.as_str()).await?;
        let total = records.len();
        records.truncate(self.limit);
        info!(symbol = %symbol, total, kept = records.len(), "News fetched");
        Ok(records)
    }

    /// Records rendered as text, or the no-results sentinel
    pub async fn fetch_text(&self, symbol: &Symbol) -> Result<String> {
        let records = self.fetch(symbol).await?;
        if records.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }

        let text = records
            .iter()
            .map(NewsRecord::format_block)
            .collect::<Vec<_>>()
            .join("\n");
        debug!(symbol = %symbol, preview = %text.chars().take(200).collect::<String>(), "News text");
        Ok(text)
    }
}
