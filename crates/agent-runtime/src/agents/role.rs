//! Role-based agent (a persona wrapped around AgentExecutor)

use crate::executor::AgentExecutor;
use agent_core::{Agent, Context, Result};
use async_trait::async_trait;
use tracing::Instrument;

/// Persona of an agent: who it is, what it wants, where it comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub max_iterations: usize,
}

impl AgentProfile {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            max_iterations: 5,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// System prompt composed from the persona
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {role}. {backstory}\n\
             Your personal goal is: {goal}\n\
             Use the tools you have when they help. When you are done, reply with \
             your final answer only.",
            role = self.role,
            backstory = self.backstory.trim(),
            goal = self.goal.trim(),
        )
    }
}

/// An agent that plays a role using the LLM loop with tool execution
///
/// # Example
///
/// ```no_run
/// use agent_runtime::{AgentProfile, AgentRuntime};
/// use agent_core::{Agent, Context};
///
/// # async fn example(runtime: AgentRuntime) -> agent_core::Result<()> {
/// let profile = AgentProfile::new(
///     "Cryptocurrency Report Writer",
///     "Summarize the market",
///     "You write concise market notes.",
/// );
/// let writer = runtime.create_role_agent(profile, None)?;
///
/// let mut context = Context::new().with_symbol("BTC");
/// let report = writer.process("Write the BTC report".to_string(), &mut context).await?;
/// # Ok(())
/// # }
/// ```
pub struct RoleAgent {
    profile: AgentProfile,
    executor: AgentExecutor,
}

impl RoleAgent {
    pub fn new(profile: AgentProfile, executor: AgentExecutor) -> Self {
        Self { profile, executor }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Get a reference to the underlying executor
    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }
}

#[async_trait]
impl Agent for RoleAgent {
    async fn process(&self, input: String, context: &mut Context) -> Result<String> {
        let span = tracing::info_span!(
            "role_agent",
            role = %self.profile.role,
            symbol = context.symbol().unwrap_or_default(),
            date = context.current_date().unwrap_or_default(),
            request_id = context.request_id().unwrap_or_default(),
        );
        self.executor.run(input).instrument(span).await
    }

    fn name(&self) -> &str {
        &self.profile.role
    }
}
