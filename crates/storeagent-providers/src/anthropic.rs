//! Anthropic provider for Claude models.
//!
//! Anthropic's Messages API differs from the OpenAI family on every axis
//! that matters here: system text travels in a top-level `system` field
//! rather than as a message, message content is a list of typed blocks,
//! tool invocations are `tool_use` blocks, tool results are `tool_result`
//! blocks inside a user turn, and auth uses `x-api-key` plus a pinned
//! `anthropic-version` header.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use storeagent_core::{Message, ProviderError, Role, ToolCall, ToolDefinition};

use crate::factory::ProviderContext;
use crate::traits::{ChatOptions, ChatProvider, ChatReply, ChatResult, ModelEntry, Usage};
use crate::usage::UsageLedger;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    ledger: Arc<UsageLedger>,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, ledger: Arc<UsageLedger>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            ledger,
        }
    }

    /// Factory builder.
    pub fn from_context(ctx: ProviderContext) -> Arc<dyn ChatProvider> {
        Arc::new(Self::new(ctx.credential, ctx.ledger))
    }

    /// Fold the canonical conversation into Anthropic's shape.
    ///
    /// System turns are hoisted into the returned system string; when
    /// `system_prompt` is set it wins over any system turns in the history.
    /// Tool-result turns fold into `user` messages carrying `tool_result`
    /// blocks, which is the only place the API accepts them.
    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> WireRequest {
        let mut system_parts = Vec::new();
        let mut wire_messages: Vec<WireMessage> = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                Role::System => {
                    if options.system_prompt.is_none() {
                        system_parts.push(message.content.clone());
                    }
                }
                Role::User => wire_messages.push(WireMessage {
                    role: "user".to_string(),
                    content: vec![ContentBlock::Text {
                        text: message.content.clone(),
                    }],
                }),
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !message.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: message.content.clone(),
                        });
                    }
                    for call in &message.tool_calls {
                        blocks.push(ContentBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: serde_json::from_str(&call.arguments)
                                .unwrap_or(serde_json::Value::Null),
                        });
                    }
                    wire_messages.push(WireMessage {
                        role: "assistant".to_string(),
                        content: blocks,
                    });
                }
                Role::Tool => {
                    let block = ContentBlock::ToolResult {
                        tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                        content: message.content.clone(),
                    };
                    // Consecutive tool results share one user turn.
                    match wire_messages.last_mut() {
                        Some(last) if last.role == "user" && last.has_tool_results() => {
                            last.content.push(block);
                        }
                        _ => wire_messages.push(WireMessage {
                            role: "user".to_string(),
                            content: vec![block],
                        }),
                    }
                }
            }
        }

        let system = options
            .system_prompt
            .clone()
            .or_else(|| {
                if system_parts.is_empty() {
                    None
                } else {
                    Some(system_parts.join("\n\n"))
                }
            });

        let wire_tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|tool| WireTool {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        input_schema: tool.parameters.clone(),
                    })
                    .collect(),
            )
        };

        WireRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system,
            messages: wire_messages,
            tools: wire_tools,
        }
    }

    fn parse_response(&self, response: WireResponse) -> Result<ChatResult, ProviderError> {
        let usage = Usage {
            prompt_tokens: response.usage.input_tokens,
            completion_tokens: response.usage.output_tokens,
            total_tokens: response.usage.input_tokens + response.usage.output_tokens,
        };

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();
        for block in response.content {
            match block {
                ContentBlock::Text { text } => text_parts.push(text),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, input));
                }
                ContentBlock::ToolResult { .. } => {}
            }
        }

        let reply = if !tool_calls.is_empty() {
            ChatReply::ToolCalls(tool_calls)
        } else if !text_parts.is_empty() {
            ChatReply::Content(text_parts.join(""))
        } else {
            return Err(ProviderError::invalid_response(
                "anthropic",
                "response carries neither text nor tool use blocks",
            ));
        };

        Ok(ChatResult {
            reply,
            usage,
            model: response.model,
        })
    }

    async fn dispatch(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::not_configured("anthropic"));
        }

        let request = self.build_request(messages, tools, options);
        debug!(provider = "anthropic", model = %request.model, "sending chat request");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(options.timeout_seconds))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::network("anthropic", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "anthropic", status, "vendor API error");
            return Err(ProviderError::api_error("anthropic", status, body));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response("anthropic", e.to_string()))?;

        let result = self.parse_response(wire)?;
        self.ledger.record("anthropic", &result.usage);
        Ok(result)
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn display_name(&self) -> &str {
        "Anthropic"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn model_catalog(&self) -> Vec<ModelEntry> {
        vec![
            ModelEntry {
                id: "claude-sonnet-4-20250514".to_string(),
                display_name: "Claude Sonnet 4".to_string(),
                context_length: 200_000,
                description: "Balanced speed and capability".to_string(),
            },
            ModelEntry {
                id: "claude-opus-4-20250514".to_string(),
                display_name: "Claude Opus 4".to_string(),
                context_length: 200_000,
                description: "Most capable Claude model".to_string(),
            },
            ModelEntry {
                id: "claude-3-5-haiku-20241022".to_string(),
                display_name: "Claude 3.5 Haiku".to_string(),
                context_length: 200_000,
                description: "Fastest, lowest-cost model".to_string(),
            },
        ]
    }

    fn default_context_length(&self) -> u32 {
        200_000
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
struct WireRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: Vec<ContentBlock>,
}

impl WireMessage {
    fn has_tool_results(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolResult { .. }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct WireTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}
