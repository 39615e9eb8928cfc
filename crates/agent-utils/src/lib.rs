//! Shared utilities for agent-rs
//!
//! This crate provides common functionality used across the agent-rs workspace:
//! tracing setup and helpers for reading configuration from the environment.

pub mod config;
pub mod logging;

pub use config::{ConfigError, env_or, env_parse_or, require_env};
pub use logging::{LogFormat, init_tracing_with};
