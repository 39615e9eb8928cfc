//! Tool registry for managing available tools

use crate::Tool;
use agent_core::{Error, Result};
use agent_llm::ToolDefinition;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::debug;

/// Registry for managing tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.get(name).cloned()
    }

    /// Tool definitions to send to the LLM, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut defs: Vec<ToolDefinition> = tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a registered tool by name
    pub async fn execute(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::ProcessingFailed(format!("Tool '{name}' not found")))?;

        let started = Instant::now();
        let result = tool.execute(params).await;
        debug!(
            tool = name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Tool finished"
        );
        result
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio_test::assert_err;

    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        async fn execute(&self, params: Value) -> Result<Value> {
            Ok(json!({ "echo": params }))
        }

        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoTool { name: "search_tool" }));
        registry.register(Arc::new(EchoTool { name: "price_tool" }));
        assert_eq!(registry.len(), 2);

        let out = registry
            .execute("search_tool", json!({"symbol": "BTC"}))
            .await
            .unwrap();
        assert_eq!(out["echo"]["symbol"], "BTC");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert_err!(registry.execute("nope", json!({})).await);
    }

    #[test]
    fn test_definitions_sorted() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "search_tool" }));
        registry.register(Arc::new(EchoTool { name: "price_tool" }));

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["price_tool", "search_tool"]);
    }
}
