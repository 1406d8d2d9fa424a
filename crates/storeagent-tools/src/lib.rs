//! # storeagent-tools
//!
//! Tool registry for Storeagent: commerce operations register a JSON-schema
//! definition plus an async callback, the registry projects definitions into
//! the catalog shapes vendor adapters consume, routes executions to the
//! right callback, and emits an audit record for every invocation.

pub mod audit;
pub mod registry;

use thiserror::Error;

pub use audit::{AuditKind, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use registry::{FnCallback, SchemaFormat, ToolCallback, ToolRegistry};

/// Errors produced by tool lookup and execution.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("unknown tool: {0}")]
    InvalidTool(String),

    /// The arguments blob was not valid JSON.
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// The callback itself failed.
    #[error("tool '{name}' failed: {message}")]
    Execution { name: String, message: String },
}
