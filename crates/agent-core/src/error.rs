//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Agent initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// The agent loop ran out of iterations before producing a final answer
    #[error("Agent '{agent}' exceeded {max_iterations} iterations without a final answer")]
    IterationLimit {
        agent: String,
        max_iterations: usize,
    },

    /// A task graph is malformed (unknown dependency, duplicate id, cycle)
    #[error("Invalid task graph: {0}")]
    InvalidGraph(String),
}
