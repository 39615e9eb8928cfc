//! Concrete agent implementations
//!
//! - RoleAgent: a persona (role, goal, backstory) driving the LLM/tool loop

pub mod role;

pub use role::{AgentProfile, RoleAgent};
