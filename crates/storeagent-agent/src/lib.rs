//! # storeagent-agent
//!
//! The bounded tool-invocation loop: hand a conversation to the model,
//! execute whatever tools it requests, feed the results back, and repeat
//! until the model answers in plain text or the iteration bound trips.
//! Destructive tools never run without explicit authorization.

pub mod agent;

pub use agent::{ExecutedTool, LoopConfig, LoopError, LoopOutcome, ToolLoop};
