//! Google Gemini provider.
//!
//! Gemini's generateContent API renames the assistant role to `model`,
//! carries conversation turns as `contents` with typed `parts`, hoists
//! system text into `systemInstruction`, and authenticates with a `key`
//! query parameter instead of a header. Tool calls come back as
//! `functionCall` parts without ids; ids are synthesized locally and
//! tool results replay as `functionResponse` parts keyed by function
//! name, resolved through the calls recorded in prior assistant turns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use storeagent_core::{Message, ProviderError, Role, ToolCall, ToolDefinition};

use crate::factory::ProviderContext;
use crate::traits::{ChatOptions, ChatProvider, ChatReply, ChatResult, ModelEntry, Usage};
use crate::usage::UsageLedger;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    ledger: Arc<UsageLedger>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, ledger: Arc<UsageLedger>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_URL.to_string(),
            ledger,
        }
    }

    /// Factory builder.
    pub fn from_context(ctx: ProviderContext) -> Arc<dyn ChatProvider> {
        Arc::new(Self::new(ctx.credential, ctx.ledger))
    }

    fn resolve_model(&self, options: &ChatOptions) -> String {
        options
            .model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".to_string())
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> WireRequest {
        // Gemini has no tool-call ids, so result replay is keyed by
        // function name. Map each id we handed out back to the name it
        // was synthesized for.
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        for message in messages {
            for call in &message.tool_calls {
                call_names.insert(call.id.as_str(), call.name.as_str());
            }
        }

        let mut system_parts = Vec::new();
        let mut contents: Vec<WireContent> = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                Role::System => {
                    if options.system_prompt.is_none() {
                        system_parts.push(message.content.clone());
                    }
                }
                Role::User => contents.push(WireContent {
                    role: "user".to_string(),
                    parts: vec![WirePart::text(&message.content)],
                }),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !message.content.is_empty() {
                        parts.push(WirePart::text(&message.content));
                    }
                    for call in &message.tool_calls {
                        parts.push(WirePart {
                            function_call: Some(WireFunctionCall {
                                name: call.name.clone(),
                                args: serde_json::from_str(&call.arguments)
                                    .unwrap_or(serde_json::Value::Null),
                            }),
                            ..WirePart::default()
                        });
                    }
                    contents.push(WireContent {
                        role: "model".to_string(),
                        parts,
                    });
                }
                Role::Tool => {
                    let name = message
                        .tool_call_id
                        .as_deref()
                        .and_then(|id| call_names.get(id).copied())
                        .unwrap_or("unknown");
                    let response = serde_json::from_str(&message.content)
                        .unwrap_or_else(|_| serde_json::json!({"result": message.content}));
                    contents.push(WireContent {
                        role: "user".to_string(),
                        parts: vec![WirePart {
                            function_response: Some(WireFunctionResponse {
                                name: name.to_string(),
                                response,
                            }),
                            ..WirePart::default()
                        }],
                    });
                }
            }
        }

        let system_instruction = options
            .system_prompt
            .clone()
            .or_else(|| {
                if system_parts.is_empty() {
                    None
                } else {
                    Some(system_parts.join("\n\n"))
                }
            })
            .map(|text| WireSystemInstruction {
                parts: vec![WirePart::text(&text)],
            });

        let wire_tools = if tools.is_empty() {
            None
        } else {
            Some(vec![WireToolGroup {
                function_declarations: tools
                    .iter()
                    .map(|tool| WireFunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        WireRequest {
            contents,
            system_instruction,
            tools: wire_tools,
            generation_config: WireGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        }
    }

    fn parse_response(
        &self,
        response: WireResponse,
        model: String,
    ) -> Result<ChatResult, ProviderError> {
        let usage = response
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::invalid_response("gemini", "response carried no candidates")
        })?;

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.parts {
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall::new(
                    format!("call_{}", Uuid::new_v4().simple()),
                    call.name,
                    call.args,
                ));
            } else if let Some(text) = part.text {
                text_parts.push(text);
            }
        }

        let reply = if !tool_calls.is_empty() {
            ChatReply::ToolCalls(tool_calls)
        } else if !text_parts.is_empty() {
            ChatReply::Content(text_parts.join(""))
        } else {
            return Err(ProviderError::invalid_response(
                "gemini",
                "candidate carries neither text nor function calls",
            ));
        };

        Ok(ChatResult { reply, usage, model })
    }

    async fn dispatch(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::not_configured("gemini"));
        }

        let model = self.resolve_model(options);
        let request = self.build_request(messages, tools, options);
        debug!(provider = "gemini", model = %model, "sending chat request");

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(options.timeout_seconds))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::network("gemini", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "gemini", status, "vendor API error");
            return Err(ProviderError::api_error("gemini", status, body));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response("gemini", e.to_string()))?;

        let result = self.parse_response(wire, model)?;
        self.ledger.record("gemini", &result.usage);
        Ok(result)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn display_name(&self) -> &str {
        "Google Gemini"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn model_catalog(&self) -> Vec<ModelEntry> {
        vec![
            ModelEntry {
                id: "gemini-2.0-flash".to_string(),
                display_name: "Gemini 2.0 Flash".to_string(),
                context_length: 1_048_576,
                description: "Fast general-purpose model".to_string(),
            },
            ModelEntry {
                id: "gemini-1.5-pro".to_string(),
                display_name: "Gemini 1.5 Pro".to_string(),
                context_length: 2_097_152,
                description: "Long-context flagship".to_string(),
            },
            ModelEntry {
                id: "gemini-1.5-flash".to_string(),
                display_name: "Gemini 1.5 Flash".to_string(),
                context_length: 1_048_576,
                description: "Low-latency workhorse".to_string(),
            },
        ]
    }

    fn default_context_length(&self) -> u32 {
        1_048_576
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.dispatch(messages, &[], options).await
    }

    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.dispatch(messages, tools, options).await
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireToolGroup>>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    role: String,
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

impl WirePart {
    fn text(value: &str) -> Self {
        Self {
            text: Some(value.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireSystemInstruction {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireToolGroup {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    candidates: Vec<WireCandidate>,
    usage_metadata: Option<WireUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: WireContent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> GeminiProvider {
        GeminiProvider::new("test-key", Arc::new(UsageLedger::new()))
    }

    #[test]
    fn test_assistant_role_renamed_to_model() {
        let provider = provider();
        let messages = vec![Message::user("Hi"), Message::assistant("Hello")];
        let request =
            provider.build_request(&messages, &[], &ChatOptions::default());
        assert_eq!(request.contents[0].role, "user");
        assert_eq!(request.contents[1].role, "model");
    }

    #[test]
    fn test_system_text_becomes_instruction() {
        let provider = provider();
        let messages = vec![Message::system("Stay on topic."), Message::user("Hi")];
        let request =
            provider.build_request(&messages, &[], &ChatOptions::default());
        let instruction = request.system_instruction.unwrap();
        assert_eq!(instruction.parts[0].text.as_deref(), Some("Stay on topic."));
        assert_eq!(request.contents.len(), 1);
    }

    #[test]
    fn test_tool_result_replays_as_function_response() {
        let provider = provider();
        let call = ToolCall::new("call_x", "get_order", json!({"order_id": 7}));
        let messages = vec![
            Message::user("order 7?"),
            Message::assistant_tool_calls("", vec![call]),
            Message::tool_result("call_x", r#"{"status":"shipped"}"#),
        ];
        let request =
            provider.build_request(&messages, &[], &ChatOptions::default());

        let replay = &request.contents[2];
        assert_eq!(replay.role, "user");
        let response = replay.parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.name, "get_order");
        assert_eq!(response.response, json!({"status": "shipped"}));
    }

    #[test]
    fn test_tools_grouped_under_function_declarations() {
        let provider = provider();
        let tools = vec![ToolDefinition::new("list_products", "List products")];
        let request = provider.build_request(
            &[Message::user("what do you sell?")],
            &tools,
            &ChatOptions::default(),
        );
        let groups = request.tools.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].function_declarations[0].name, "list_products");
        // Declarations always carry a parameters object, even when empty.
        assert_eq!(
            groups[0].function_declarations[0].parameters,
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn test_parse_function_call_synthesizes_id() {
        let provider = provider();
        let wire: WireResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "update_setting",
                        "args": {"settingId": "currency", "value": "EUR"}}}]
                }
            }],
            "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 6,
                "totalTokenCount": 26}
        }))
        .unwrap();

        let result = provider
            .parse_response(wire, "gemini-2.0-flash".to_string())
            .unwrap();
        let calls = result.tool_calls().unwrap();
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].name, "update_setting");
        assert_eq!(result.usage.total_tokens, 26);
    }

    #[test]
    fn test_parse_text_response() {
        let provider = provider();
        let wire: WireResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "We sell hats."}]}
            }]
        }))
        .unwrap();
        let result = provider
            .parse_response(wire, "gemini-2.0-flash".to_string())
            .unwrap();
        assert_eq!(result.content(), Some("We sell hats."));
        assert_eq!(result.usage.total_tokens, 0);
    }

    #[test]
    fn test_context_lengths() {
        let provider = provider();
        assert_eq!(provider.max_context_length(Some("gemini-1.5-pro")), 2_097_152);
        assert_eq!(provider.max_context_length(None), 1_048_576);
    }

    #[tokio::test]
    async fn test_missing_credential_is_not_configured() {
        let provider = GeminiProvider::new("", Arc::new(UsageLedger::new()));
        let err = provider
            .chat(&[Message::user("hi")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }
}
