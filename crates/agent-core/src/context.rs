//! Execution context shared by the agents of one request
//!
//! The `Context` struct is a key-value store carrying request-scoped values
//! (symbol, date, request id) and the outputs of tasks that already ran, so that
//! downstream tasks can consume them explicitly.

use std::collections::HashMap;

/// Well-known context keys
pub mod keys {
    /// Ticker the request is about (e.g., "BTC")
    pub const SYMBOL: &str = "symbol";
    /// Current date/time injected into task prompts
    pub const CURRENT_DATE: &str = "current_date";
    /// Correlation id for log lines of one request
    pub const REQUEST_ID: &str = "request_id";
    /// Prefix under which task outputs are stored
    pub const TASK_OUTPUT_PREFIX: &str = "task_output.";
}

/// Context passed to agents during execution
///
/// # Example
///
/// ```
/// use agent_core::Context;
///
/// let mut ctx = Context::new().with_symbol("BTC");
/// ctx.set_task_output("news_analysis", "Bullish headlines");
///
/// assert_eq!(ctx.symbol(), Some("BTC"));
/// assert_eq!(ctx.task_output("news_analysis"), Some("Bullish headlines"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    data: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    // =========== Builder Methods ===========

    /// Set the symbol
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.insert(keys::SYMBOL, serde_json::json!(symbol.into()));
        self
    }

    /// Set the current date string
    pub fn with_current_date(mut self, date: impl Into<String>) -> Self {
        self.insert(keys::CURRENT_DATE, serde_json::json!(date.into()));
        self
    }

    /// Set the request ID
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.insert(keys::REQUEST_ID, serde_json::json!(request_id.into()));
        self
    }

    // =========== Common Accessors ===========

    pub fn symbol(&self) -> Option<&str> {
        self.get_str(keys::SYMBOL)
    }

    pub fn current_date(&self) -> Option<&str> {
        self.get_str(keys::CURRENT_DATE)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.get_str(keys::REQUEST_ID)
    }

    // =========== Task Outputs ===========

    /// Record the output of a finished task
    pub fn set_task_output(&mut self, task_id: &str, output: impl Into<String>) {
        self.insert(
            format!("{}{task_id}", keys::TASK_OUTPUT_PREFIX),
            serde_json::json!(output.into()),
        );
    }

    /// Output of a finished task, if it has run
    pub fn task_output(&self, task_id: &str) -> Option<&str> {
        self.get_str(&format!("{}{task_id}", keys::TASK_OUTPUT_PREFIX))
    }

    /// Whether the task has already produced output
    pub fn has_task_output(&self, task_id: &str) -> bool {
        self.task_output(task_id).is_some()
    }

    // =========== Generic Key-Value Operations ===========

    /// Insert a value into the context
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a value from the context
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}
