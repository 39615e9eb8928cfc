//! Core abstractions for agent-rs
//!
//! This crate defines the fundamental traits and types used throughout the workspace:
//! the [`Agent`] trait, the [`Context`] threaded between agents, and the shared [`Error`].

pub mod agent;
pub mod context;
pub mod error;

pub use agent::Agent;
pub use context::Context;
pub use error::{Error, Result};
