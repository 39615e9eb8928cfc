//! LLM-callable tools wrapping the fetchers

mod news;
mod price;

pub use news::SearchTool;
pub use price::PriceTool;

use agent_llm::tools::schema;
use serde_json::{Value, json};

/// `{ "symbol": string }`, the only argument either tool takes
fn symbol_schema() -> Value {
    schema::object(
        json!({ "symbol": schema::string("Cryptocurrency ticker symbol, e.g. BTC") }),
        &["symbol"],
    )
}
