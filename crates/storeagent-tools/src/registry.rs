//! Tool registry and execution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use storeagent_core::ToolDefinition;

use crate::audit::{AuditKind, AuditSink, TracingAuditSink};
use crate::ToolError;

/// Host-supplied implementation of a tool.
///
/// The registry treats the returned value as opaque; commerce callbacks
/// conventionally return `{success, message, ...}` and the loop hands it
/// to the model uninterpreted.
#[async_trait]
pub trait ToolCallback: Send + Sync {
    async fn invoke(&self, arguments: Value) -> anyhow::Result<Value>;
}

/// Adapter so plain closures can serve as callbacks.
pub struct FnCallback<F> {
    func: F,
}

impl<F> FnCallback<F>
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> ToolCallback for FnCallback<F>
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync,
{
    async fn invoke(&self, arguments: Value) -> anyhow::Result<Value> {
        (self.func)(arguments)
    }
}

/// The two catalog shapes adapters consume. Gemini and xAI reshape the
/// OpenAI projection inside their own codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    OpenAi,
    Anthropic,
}

struct RegisteredTool {
    definition: ToolDefinition,
    callback: Arc<dyn ToolCallback>,
}

/// Registry of callable tools, keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    audit: Arc<dyn AuditSink>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_audit(Arc::new(TracingAuditSink))
    }

    pub fn with_audit(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            tools: HashMap::new(),
            audit,
        }
    }

    /// Register a tool. Re-registering a name replaces the previous entry.
    pub fn register(&mut self, definition: ToolDefinition, callback: Arc<dyn ToolCallback>) {
        if self.tools.contains_key(&definition.name) {
            debug!(tool = %definition.name, "replacing registered tool");
        }
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                callback,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn is_destructive(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .map(|tool| tool.definition.destructive)
            .unwrap_or(false)
    }

    /// Registered definitions, sorted by name for stable catalogs.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| tool.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Project the catalog into a vendor schema family.
    pub fn project_for(&self, format: SchemaFormat) -> Vec<Value> {
        self.definitions()
            .into_iter()
            .map(|definition| match format {
                SchemaFormat::OpenAi => json!({
                    "type": "function",
                    "function": {
                        "name": definition.name,
                        "description": definition.description,
                        "parameters": definition.parameters,
                    }
                }),
                SchemaFormat::Anthropic => json!({
                    "name": definition.name,
                    "description": definition.description,
                    "input_schema": definition.parameters,
                }),
            })
            .collect()
    }

    /// Decode the arguments blob and run the named tool's callback.
    pub async fn execute(&self, name: &str, arguments_json: &str) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::InvalidTool(name.to_string()))?;

        let arguments: Value = serde_json::from_str(arguments_json)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        self.audit.record(
            AuditKind::ToolStart,
            json!({"tool": name, "arguments": arguments}),
        );

        match tool.callback.invoke(arguments).await {
            Ok(value) => {
                self.audit
                    .record(AuditKind::ToolSuccess, json!({"tool": name}));
                Ok(value)
            }
            Err(e) => {
                let message = e.to_string();
                self.audit.record(
                    AuditKind::ToolFailure,
                    json!({"tool": name, "error": message}),
                );
                Err(ToolError::Execution {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use anyhow::bail;

    fn echo_callback() -> Arc<dyn ToolCallback> {
        Arc::new(FnCallback::new(|args| {
            Ok(json!({"success": true, "echo": args}))
        }))
    }

    fn registry_with(definitions: Vec<ToolDefinition>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for definition in definitions {
            registry.register(definition, echo_callback());
        }
        registry
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition::new("get_order", "v1"), echo_callback());
        registry.register(ToolDefinition::new("get_order", "v2"), echo_callback());

        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].description, "v2");
    }

    #[test]
    fn test_destructive_flag_lookup() {
        let registry = registry_with(vec![
            ToolDefinition::new("get_order", "Read an order"),
            ToolDefinition::new("refund_order", "Refund an order").destructive(),
        ]);
        assert!(!registry.is_destructive("get_order"));
        assert!(registry.is_destructive("refund_order"));
        assert!(!registry.is_destructive("missing"));
    }

    #[test]
    fn test_projection_shapes() {
        let registry = registry_with(vec![ToolDefinition::new("list_products", "List products")
            .with_parameters(json!({"type": "object", "properties": {"limit": {"type": "integer"}}}))]);

        let openai = registry.project_for(SchemaFormat::OpenAi);
        assert_eq!(openai[0]["type"], "function");
        assert_eq!(openai[0]["function"]["name"], "list_products");
        assert!(openai[0]["function"]["parameters"]["properties"]["limit"].is_object());

        let anthropic = registry.project_for(SchemaFormat::Anthropic);
        assert_eq!(anthropic[0]["name"], "list_products");
        assert!(anthropic[0]["input_schema"]["properties"]["limit"].is_object());
    }

    #[tokio::test]
    async fn test_execute_routes_to_callback() {
        let registry = registry_with(vec![ToolDefinition::new("get_order", "Read an order")]);
        let value = registry
            .execute("get_order", r#"{"order_id": 42}"#)
            .await
            .unwrap();
        assert_eq!(value["echo"]["order_id"], 42);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", "{}").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidTool(_)));
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_rejected() {
        let registry = registry_with(vec![ToolDefinition::new("get_order", "Read an order")]);
        let err = registry.execute("get_order", "not json").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_callback_failure_is_captured() {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut registry = ToolRegistry::with_audit(sink.clone());
        registry.register(
            ToolDefinition::new("flaky", "Always fails"),
            Arc::new(FnCallback::new(|_| bail!("backend unavailable"))),
        );

        let err = registry.execute("flaky", "{}").await.unwrap_err();
        assert!(matches!(err, ToolError::Execution { .. }));

        let kinds: Vec<AuditKind> = sink.records().iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![AuditKind::ToolStart, AuditKind::ToolFailure]);
    }

    #[tokio::test]
    async fn test_success_emits_start_then_success() {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut registry = ToolRegistry::with_audit(sink.clone());
        registry.register(ToolDefinition::new("get_order", "Read an order"), echo_callback());

        registry.execute("get_order", "{}").await.unwrap();
        let kinds: Vec<AuditKind> = sink.records().iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![AuditKind::ToolStart, AuditKind::ToolSuccess]);
    }
}
