//! Agent executor for running agent loops
//!
//! The AgentExecutor implements the core agent loop pattern:
//! 1. Wait for the throttle, then call the LLM with history and tools
//! 2. Check stop reason
//! 3. If tool use requested, execute tools and loop back
//! 4. If completed, return final response
//!
//! Running out of iterations without a final answer is an error.

use crate::throttle::StepThrottle;
use agent_core::{Error, Result};
use agent_llm::{CompletionRequest, ContentBlock, LLMProvider, Message, StopReason};
use agent_tools::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Name used in logs and errors
    pub agent_name: String,

    /// Maximum number of LLM calls before giving up
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            agent_name: "agent".to_string(),
            max_iterations: 5,
            model: "gemini-2.0-flash".to_string(),
            system_prompt: None,
            max_tokens: 4096,
            temperature: Some(0.7),
        }
    }
}

/// Executes an agent loop: LLM → tool calls → execution → loop back
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    throttle: Arc<StepThrottle>,
    config: ExecutorConfig,
}

impl AgentExecutor {
    /// Create a new agent executor
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        throttle: Arc<StepThrottle>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            throttle,
            config,
        }
    }

    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::new()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Execute the agent loop with a user query
    ///
    /// # Returns
    ///
    /// The final response from the agent after all tool calls are complete
    pub async fn run(&self, user_message: String) -> Result<String> {
        let mut conversation = vec![Message::user(user_message)];
        let agent = self.config.agent_name.as_str();
        let tools = self.tool_registry.definitions();

        for iteration in 1..=self.config.max_iterations {
            info!(
                agent,
                iteration,
                max_iterations = self.config.max_iterations,
                "Agent iteration started"
            );

            let mut request_builder = CompletionRequest::builder(&self.config.model)
                .messages(conversation.clone())
                .max_tokens(self.config.max_tokens);

            if let Some(system) = &self.config.system_prompt {
                request_builder = request_builder.system(system.clone());
            }
            if let Some(temperature) = self.config.temperature {
                request_builder = request_builder.temperature(temperature);
            }
            if !tools.is_empty() {
                request_builder = request_builder.tools(tools.clone());
            }

            self.throttle.before_call().await;

            let response = self
                .provider
                .complete(request_builder.build())
                .await
                .map_err(|e| Error::ProcessingFailed(format!("LLM request failed: {e}")))?;

            info!(
                agent,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM response received"
            );

            let text = response.message.text();
            if let Some(text) = &text {
                let preview: String = text.chars().take(300).collect();
                debug!(agent, response_preview = %preview, "LLM response content preview");
            }

            match response.stop_reason {
                StopReason::ToolUse => {
                    let results = self.execute_tools(&response.message).await;
                    conversation.push(response.message);

                    if results.is_empty() {
                        warn!(agent, "No tool calls despite ToolUse stop reason");
                        conversation.push(Message::user(
                            "No tool call was found. Give your final answer.",
                        ));
                    } else {
                        conversation.extend(results);
                    }

                    self.throttle.after_step().await;
                }

                StopReason::EndTurn | StopReason::StopSequence => {
                    self.throttle.after_step().await;
                    return match text.filter(|t| !t.trim().is_empty()) {
                        Some(text) => {
                            info!(
                                agent,
                                iteration,
                                response_length = text.len(),
                                "Agent completed"
                            );
                            Ok(text)
                        }
                        None => Err(Error::ProcessingFailed(format!(
                            "Agent '{agent}' returned an empty answer"
                        ))),
                    };
                }

                StopReason::MaxTokens => {
                    warn!(agent, "Hit max tokens in LLM response");
                    self.throttle.after_step().await;
                    return text.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
                        Error::ProcessingFailed(format!(
                            "Agent '{agent}' hit the token limit before answering"
                        ))
                    });
                }
            }
        }

        warn!(
            agent,
            max_iterations = self.config.max_iterations,
            "Max iterations reached without a final answer"
        );
        Err(Error::IterationLimit {
            agent: agent.to_string(),
            max_iterations: self.config.max_iterations,
        })
    }

    /// Execute tool calls from an assistant message
    ///
    /// Failures are reported back to the model as error results.
    async fn execute_tools(&self, message: &Message) -> Vec<Message> {
        let mut results = Vec::new();

        for tool_use in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = tool_use else {
                continue;
            };

            let input_preview: String = input.to_string().chars().take(500).collect();
            info!(tool_name = %name, tool_id = %id, input_preview = %input_preview, "Executing tool");

            let start_time = Instant::now();
            match self.tool_registry.execute(name, input.clone()).await {
                Ok(result) => {
                    let result_str = match result {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    info!(
                        tool_name = %name,
                        duration_ms = start_time.elapsed().as_millis() as u64,
                        result_length = result_str.len(),
                        "Tool execution succeeded"
                    );
                    results.push(Message::tool_result(id.clone(), result_str));
                }
                Err(e) => {
                    warn!(
                        tool_name = %name,
                        duration_ms = start_time.elapsed().as_millis() as u64,
                        error = %e,
                        "Tool execution failed"
                    );
                    results.push(Message::tool_error(id.clone(), format!("Error: {e}")));
                }
            }
        }

        results
    }
}

/// Builder for AgentExecutor
pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Arc<ToolRegistry>,
    throttle: Arc<StepThrottle>,
    config: ExecutorConfig,
}

impl AgentExecutorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            provider: None,
            tool_registry: Arc::new(ToolRegistry::new()),
            throttle: Arc::new(StepThrottle::unlimited()),
            config: ExecutorConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool registry
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = registry;
        self
    }

    /// Set the shared throttle
    pub fn throttle(mut self, throttle: Arc<StepThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn agent_name(mut self, name: impl Into<String>) -> Self {
        self.config.agent_name = name.into();
        self
    }

    /// Set maximum iterations
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Build the executor
    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("Provider not set".to_string()))?;

        if self.config.max_iterations == 0 {
            return Err(Error::InitializationFailed(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(AgentExecutor::new(
            provider,
            self.tool_registry,
            self.throttle,
            self.config,
        ))
    }
}

impl Default for AgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use agent_llm::{CompletionResponse, TokenUsage};
    use agent_tools::Tool;
    use async_trait::async_trait;
    use mockall::{Sequence, mock};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    mock! {
        pub Provider {}

        #[async_trait]
        impl LLMProvider for Provider {
            async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse>;
            fn name(&self) -> &str;
        }
    }

    pub(crate) fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    pub(crate) fn tool_call_response(name: &str, input: Value) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant_blocks(vec![ContentBlock::ToolUse {
                id: format!("call_0_{name}"),
                name: name.to_string(),
                input,
            }]),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    struct RecordingTool {
        calls: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        async fn execute(&self, params: Value) -> Result<Value> {
            self.calls.lock().unwrap().push(params);
            Ok(json!("2024-01-01 - 42000.00"))
        }

        fn name(&self) -> &str {
            "price_tool"
        }

        fn description(&self) -> &str {
            "Daily closing prices"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"symbol": {"type": "string"}}})
        }
    }

    #[test]
    fn test_builder() {
        let builder = AgentExecutorBuilder::new()
            .model("test-model")
            .max_iterations(3)
            .system_prompt("Test prompt");

        assert_eq!(builder.config.model, "test-model");
        assert_eq!(builder.config.max_iterations, 3);
        assert_eq!(builder.config.system_prompt, Some("Test prompt".to_string()));
    }

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.temperature, Some(0.7));
    }

    #[test]
    fn test_build_requires_provider() {
        assert!(AgentExecutorBuilder::new().build().is_err());
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .withf(|req| req.tools.is_none() && req.system.as_deref() == Some("persona"))
            .times(1)
            .returning(|_| Ok(text_response("BTC is trending up.")));

        let executor = AgentExecutor::builder()
            .provider(Arc::new(provider))
            .system_prompt("persona")
            .build()
            .unwrap();

        let answer = assert_ok!(executor.run("Analyze BTC".into()).await);
        assert_eq!(answer, "BTC is trending up.");
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let mut seq = Sequence::new();
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .withf(|req| req.tools.as_ref().is_some_and(|t| t[0].name == "price_tool"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(tool_call_response("price_tool", json!({"symbol": "BTC"}))));
        provider
            .expect_complete()
            .withf(|req| {
                req.messages.len() == 3
                    && matches!(
                        req.messages[2].blocks().first(),
                        Some(ContentBlock::ToolResult { content, .. }) if content == "2024-01-01 - 42000.00"
                    )
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(text_response("Prices are flat.")));

        let tool = Arc::new(RecordingTool {
            calls: Mutex::new(Vec::new()),
        });
        let registry = Arc::new(ToolRegistry::new());
        registry.register(tool.clone());

        let executor = AgentExecutor::builder()
            .provider(Arc::new(provider))
            .tool_registry(registry)
            .build()
            .unwrap();

        let answer = executor.run("Analyze BTC prices".into()).await.unwrap();
        assert_eq!(answer, "Prices are flat.");
        assert_eq!(tool.calls.lock().unwrap().as_slice(), &[json!({"symbol": "BTC"})]);
    }

    #[tokio::test]
    async fn test_iteration_overflow_is_error() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(2)
            .returning(|_| Ok(tool_call_response("unknown_tool", json!({}))));

        let executor = AgentExecutor::builder()
            .provider(Arc::new(provider))
            .agent_name("looper")
            .max_iterations(2)
            .build()
            .unwrap();

        let err = executor.run("loop forever".into()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::IterationLimit { ref agent, max_iterations: 2 } if agent == "looper"
        ));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(|_| Err(agent_llm::LLMError::RateLimitExceeded("quota".into())));

        let executor = AgentExecutor::builder()
            .provider(Arc::new(provider))
            .build()
            .unwrap();

        let err = executor.run("hi".into()).await.unwrap_err();
        assert!(err.to_string().contains("Rate limit exceeded: quota"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_error() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok(text_response("   ")));

        let executor = AgentExecutor::builder()
            .provider(Arc::new(provider))
            .build()
            .unwrap();

        assert!(executor.run("hi".into()).await.is_err());
    }
}
