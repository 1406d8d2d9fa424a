//! Tool definitions and invocation types.

use serde::{Deserialize, Serialize};

/// Definition of a callable operation exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for parameters
    pub parameters: serde_json::Value,
    /// Whether this tool's side effects are hard to reverse and require
    /// explicit authorization before automatic execution
    pub destructive: bool,
}

impl ToolDefinition {
    /// Create a new tool definition with an empty parameter schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            destructive: false,
        }
    }

    /// Set the parameters schema.
    pub fn with_parameters(mut self, schema: serde_json::Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Mark as destructive.
    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }
}

/// A request from the model to call a tool.
///
/// Arguments are held as a JSON-encoded string regardless of the vendor's
/// native encoding, so the registry and conversation replay both consume one
/// uniform blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique id for this call, echoed back in the matching [`ToolResult`]
    pub id: String,
    /// Tool name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call from structured arguments.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.to_string(),
        }
    }

    /// Decode the argument blob back into structured form.
    pub fn arguments_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// Result of a tool execution, fed back into the conversation as a
/// tool-role message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the tool call this answers
    pub tool_call_id: String,
    /// String-serialized result or error description
    pub content: String,
    /// Whether the execution faulted
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create a failed result.
    pub fn error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_defaults() {
        let def = ToolDefinition::new("get_order", "Look up an order");
        assert!(!def.destructive);
        assert_eq!(def.parameters["type"], "object");
    }

    #[test]
    fn test_call_arguments_round_trip() {
        let args = json!({"order_id": 42, "include_items": true});
        let call = ToolCall::new("call_1", "get_order", args.clone());
        assert_eq!(call.arguments_value().unwrap(), args);
    }

    #[test]
    fn test_call_rejects_bad_blob() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "get_order".to_string(),
            arguments: "not json".to_string(),
        };
        assert!(call.arguments_value().is_err());
    }
}
