//! OpenAI provider implementation.
//!
//! OpenAI speaks the flat-message-list wire format: `system` is an ordinary
//! leading role, tools are declared as `{type: "function", function: {...}}`,
//! and tool results replay as `tool`-role messages carrying the originating
//! call id. xAI and DeepSeek speak the same wire format, so the typed codec
//! here ([`OpenAiCompat`]) is shared with those adapters.

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

/// Default OpenAI API base URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Shared engine for vendors speaking the OpenAI chat-completions protocol.
#[derive(Debug)]
pub(crate) struct OpenAiCompat {
    pub(crate) provider_id: &'static str,
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) default_model: String,
    pub(crate) ledger: Arc<UsageLedger>,
}

impl OpenAiCompat {
    pub(crate) fn new(
        provider_id: &'static str,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
        ledger: Arc<UsageLedger>,
    ) -> Self {
        Self {
            provider_id,
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
            ledger,
        }
    }

    fn resolve_model(&self, options: &ChatOptions) -> String {
        options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Map the canonical conversation and tool catalog to the wire shape.
    ///
    /// `system_prompt` takes precedence: when set, it becomes the single
    /// leading system message and system-role turns in the conversation are
    /// dropped, so system content is never duplicated.
    pub(crate) fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> WireRequest {
        let mut wire_messages = Vec::with_capacity(messages.len() + 1);

        if let Some(system) = &options.system_prompt {
            wire_messages.push(WireMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        for message in messages {
            if message.role == Role::System && options.system_prompt.is_some() {
                continue;
            }
            wire_messages.push(convert_message(message));
        }

        let wire_tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|tool| WireTool {
                        tool_type: "function".to_string(),
                        function: WireFunction {
                            name: tool.name.clone(),
                            description: tool.description.clone(),
                            parameters: tool.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        WireRequest {
            model: self.resolve_model(options),
            messages: wire_messages,
            max_tokens: Some(options.max_tokens),
            temperature: Some(options.temperature),
            tool_choice: wire_tools.as_ref().map(|_| "auto".to_string()),
            tools: wire_tools,
        }
    }

    /// Normalize the wire response into a [`ChatResult`].
    pub(crate) fn parse_response(
        &self,
        response: WireResponse,
        requested_model: String,
    ) -> Result<ChatResult, ProviderError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::invalid_response(self.provider_id, "response carried no choices")
        })?;

        let usage = response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let model = response.model.unwrap_or(requested_model);

        let reply = match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => {
                let mut tool_calls = Vec::with_capacity(calls.len());
                for call in calls {
                    // Vendor arguments are a JSON string; decode to validate,
                    // then re-encode into the canonical blob.
                    let arguments: serde_json::Value =
                        serde_json::from_str(&call.function.arguments).map_err(|e| {
                            ProviderError::invalid_response(
                                self.provider_id,
                                format!("tool call arguments are not valid JSON: {}", e),
                            )
                        })?;
                    tool_calls.push(ToolCall::new(call.id, call.function.name, arguments));
                }
                ChatReply::ToolCalls(tool_calls)
            }
            _ => {
                let content = choice.message.content.ok_or_else(|| {
                    ProviderError::invalid_response(
                        self.provider_id,
                        "choice carries neither content nor tool calls",
                    )
                })?;
                ChatReply::Content(content)
            }
        };

        Ok(ChatResult { reply, usage, model })
    }

    /// Send a chat request, normalize the reply, and record usage.
    pub(crate) async fn dispatch(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::not_configured(self.provider_id));
        }

        let request = self.build_request(messages, tools, options);
        debug!(provider = self.provider_id, model = %request.model, "sending chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(options.timeout_seconds))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::network(self.provider_id, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(provider = self.provider_id, status, "vendor API error");
            return Err(ProviderError::api_error(self.provider_id, status, body));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(self.provider_id, e.to_string()))?;

        let result = self.parse_response(wire, request.model)?;
        self.ledger.record(self.provider_id, &result.usage);
        Ok(result)
    }
}

/// Convert a single canonical message to the wire shape.
fn convert_message(message: &Message) -> WireMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    // Assistant turns that requested tools replay those calls in the
    // vendor's own representation; flattening them to text would get the
    // conversation rejected on resubmission.
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    tool_type: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
        )
    };

    let content = if message.content.is_empty() && tool_calls.is_some() {
        None
    } else {
        Some(message.content.clone())
    };

    WireMessage {
        role: role.to_string(),
        content,
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

/// OpenAI provider for GPT models.
#[derive(Debug)]
pub struct OpenAiProvider {
    compat: OpenAiCompat,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider.
    pub fn new(api_key: impl Into<String>, ledger: Arc<UsageLedger>) -> Self {
        Self {
            compat: OpenAiCompat::new("openai", api_key, OPENAI_API_URL, "gpt-4o", ledger),
        }
    }

    /// Set a custom base URL (for proxies and compatible endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.compat.base_url = url.into();
        self
    }

    /// Factory builder.
    pub fn from_context(ctx: ProviderContext) -> Arc<dyn ChatProvider> {
        Arc::new(Self::new(ctx.credential, ctx.ledger))
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    fn is_configured(&self) -> bool {
        !self.compat.api_key.is_empty()
    }

    fn model_catalog(&self) -> Vec<ModelEntry> {
        vec![
            ModelEntry {
                id: "gpt-4o".to_string(),
                display_name: "GPT-4o".to_string(),
                context_length: 128_000,
                description: "Flagship multimodal model".to_string(),
            },
            ModelEntry {
                id: "gpt-4o-mini".to_string(),
                display_name: "GPT-4o Mini".to_string(),
                context_length: 128_000,
                description: "Fast, inexpensive small model".to_string(),
            },
            ModelEntry {
                id: "gpt-4-turbo".to_string(),
                display_name: "GPT-4 Turbo".to_string(),
                context_length: 128_000,
                description: "Previous-generation flagship".to_string(),
            },
        ]
    }

    fn default_context_length(&self) -> u32 {
        8_192
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.compat.dispatch(messages, &[], options).await
    }

    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.compat.dispatch(messages, tools, options).await
    }
}

// Wire types

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_choice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub(crate) role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireTool {
    #[serde(rename = "type")]
    pub(crate) tool_type: String,
    pub(crate) function: WireFunction,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireFunction {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) tool_type: String,
    pub(crate) function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireFunctionCall {
    pub(crate) name: String,
    pub(crate) arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    pub(crate) choices: Vec<WireChoice>,
    pub(crate) usage: Option<WireUsage>,
    pub(crate) model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChoice {
    pub(crate) message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponseMessage {
    pub(crate) content: Option<String>,
    pub(crate) tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUsage {
    pub(crate) prompt_tokens: u32,
    pub(crate) completion_tokens: u32,
    pub(crate) total_tokens: u32,
}
