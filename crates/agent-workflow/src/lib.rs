//! Multi-agent orchestration for agent-rs
//!
//! A [`TaskGraph`] declares which agent runs which task and which earlier
//! task outputs it consumes. The graph is validated when built and runs its
//! tasks one at a time in dependency order.

pub mod graph;

// Re-export for convenience
pub use graph::{TaskGraph, TaskGraphBuilder, TaskNode};
