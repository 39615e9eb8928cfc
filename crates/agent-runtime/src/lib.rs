//! Agent runtime for executing agents
//!
//! This crate provides the runtime infrastructure for executing agents:
//! the AgentExecutor for LLM loops, the StepThrottle that paces them,
//! RoleAgent personas, and the AgentRuntime factory that wires them up.

pub mod agents;
pub mod executor;
pub mod runtime;
pub mod throttle;

// Re-export key types
pub use agents::{AgentProfile, RoleAgent};
pub use executor::{AgentExecutor, AgentExecutorBuilder, ExecutorConfig};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder, RuntimeConfig};
pub use throttle::StepThrottle;
