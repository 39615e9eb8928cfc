//! Runtime for building agents with shared dependencies
//!
//! The AgentRuntime owns the LLM provider and the step throttle shared by
//! every agent it creates, and provides factory methods for those agents.

use agent_core::Result;
use agent_llm::LLMProvider;
use agent_tools::{Tool, ToolRegistry};
use std::sync::Arc;
use tracing::debug;

use crate::agents::{AgentProfile, RoleAgent};
use crate::executor::{AgentExecutor, ExecutorConfig};
use crate::throttle::StepThrottle;

/// Configuration for the agent runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Model used by every agent
    pub default_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Max tokens per completion
    pub max_tokens: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Runtime for creating agents
///
/// # Example
///
/// ```no_run
/// use agent_runtime::{AgentProfile, AgentRuntime, StepThrottle};
/// use agent_llm::providers::GeminiProvider;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = AgentRuntime::builder()
///     .provider(Arc::new(GeminiProvider::from_env()?))
///     .throttle(Arc::new(StepThrottle::new(15, Duration::from_secs(5))))
///     .build()?;
///
/// let writer = runtime.create_role_agent(
///     AgentProfile::new("Report Writer", "Summarize", "Writes briefs."),
///     None,
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct AgentRuntime {
    provider: Arc<dyn LLMProvider>,
    throttle: Arc<StepThrottle>,
    config: RuntimeConfig,
}

impl AgentRuntime {
    /// Create a new agent runtime
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        throttle: Arc<StepThrottle>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            provider,
            throttle,
            config,
        }
    }

    /// Create a new runtime builder
    pub fn builder() -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new()
    }

    /// Get a reference to the LLM provider
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    pub fn throttle(&self) -> &Arc<StepThrottle> {
        &self.throttle
    }

    /// Get a reference to the runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create a role agent bound to at most one tool
    pub fn create_role_agent(
        &self,
        profile: AgentProfile,
        tool: Option<Arc<dyn Tool>>,
    ) -> Result<RoleAgent> {
        let registry = ToolRegistry::new();
        if let Some(tool) = tool {
            debug!(role = %profile.role, tool = tool.name(), "Binding tool to agent");
            registry.register(tool);
        }

        let executor = AgentExecutor::builder()
            .provider(self.provider.clone())
            .tool_registry(Arc::new(registry))
            .throttle(self.throttle.clone())
            .config(ExecutorConfig {
                agent_name: profile.role.clone(),
                max_iterations: profile.max_iterations,
                model: self.config.default_model.clone(),
                system_prompt: Some(profile.system_prompt()),
                max_tokens: self.config.max_tokens,
                temperature: Some(self.config.temperature),
            })
            .build()?;

        Ok(RoleAgent::new(profile, executor))
    }
}

/// Builder for AgentRuntime
pub struct AgentRuntimeBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    throttle: Option<Arc<StepThrottle>>,
    config: RuntimeConfig,
}

impl AgentRuntimeBuilder {
    /// Create a new runtime builder
    pub fn new() -> Self {
        Self {
            provider: None,
            throttle: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the shared throttle
    pub fn throttle(mut self, throttle: Arc<StepThrottle>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Set the runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default model
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Build the runtime
    ///
    /// Without an explicit throttle the default pacing (15 rpm, 5 s) applies.
    pub fn build(self) -> Result<AgentRuntime> {
        let provider = self.provider.ok_or_else(|| {
            agent_core::Error::InitializationFailed("Provider not set".to_string())
        })?;

        let throttle = self
            .throttle
            .unwrap_or_else(|| Arc::new(StepThrottle::default()));

        Ok(AgentRuntime::new(provider, throttle, self.config))
    }
}

impl Default for AgentRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
