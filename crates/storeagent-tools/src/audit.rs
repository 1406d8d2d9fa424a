//! Audit trail for tool invocations.
//!
//! Every execution emits a record on start and one on success or failure,
//! so a host can reconstruct what the model did to the store and when.

use std::sync::Mutex;

use serde_json::Value;
use tracing::{info, warn};

/// What happened to a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    ToolStart,
    ToolSuccess,
    ToolFailure,
}

/// Receiver for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, kind: AuditKind, details: Value);
}

/// Default sink that emits structured `tracing` events.
#[derive(Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, kind: AuditKind, details: Value) {
        match kind {
            AuditKind::ToolStart => info!(event = "tool_start", %details, "tool invoked"),
            AuditKind::ToolSuccess => info!(event = "tool_success", %details, "tool completed"),
            AuditKind::ToolFailure => warn!(event = "tool_failure", %details, "tool failed"),
        }
    }
}

/// Capturing sink for tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<(AuditKind, Value)>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(AuditKind, Value)> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, kind: AuditKind, details: Value) {
        self.records.lock().unwrap().push((kind, details));
    }
}
