//! Provider trait definitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use storeagent_core::{Message, ProviderError, ToolCall, ToolDefinition};

/// Options for a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Model override; `None` uses the provider default
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// System prompt; overrides any system-role message in the conversation
    pub system_prompt: Option<String>,
    /// HTTP timeout for the vendor call, in seconds
    pub timeout_seconds: u64,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: 2048,
            system_prompt: None,
            timeout_seconds: 60,
        }
    }
}

/// Token usage statistics, normalized across vendor field names.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens consumed
    pub prompt_tokens: u32,
    /// Completion tokens generated
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// What the model produced: a textual reply or a request to run tools.
#[derive(Debug, Clone)]
pub enum ChatReply {
    /// Final textual content
    Content(String),
    /// Tool invocations requested by the model, in model order
    ToolCalls(Vec<ToolCall>),
}

/// Normalized result of a chat call.
#[derive(Debug, Clone)]
pub struct ChatResult {
    /// Content or requested tool calls
    pub reply: ChatReply,
    /// Normalized usage triple
    pub usage: Usage,
    /// Model that produced the response
    pub model: String,
}

impl ChatResult {
    /// Textual content, if this is a content reply.
    pub fn content(&self) -> Option<&str> {
        match &self.reply {
            ChatReply::Content(text) => Some(text),
            ChatReply::ToolCalls(_) => None,
        }
    }

    /// Requested tool calls, if any.
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        match &self.reply {
            ChatReply::ToolCalls(calls) => Some(calls),
            ChatReply::Content(_) => None,
        }
    }
}

/// A model catalog entry with context-length metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model identifier
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    /// Context window size in tokens
    pub context_length: u32,
    /// Short description
    pub description: String,
}

/// Core provider trait - every vendor adapter implements this.
///
/// Adapters translate the canonical [`Message`]/[`ToolDefinition`] shapes to
/// the vendor wire format and normalize responses back into [`ChatResult`].
/// Errors come back as values; nothing is thrown across this boundary.
#[async_trait]
pub trait ChatProvider: std::fmt::Debug + Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn id(&self) -> &str;

    /// Human-readable name.
    fn display_name(&self) -> &str;

    /// Check whether a credential is present.
    fn is_configured(&self) -> bool;

    /// Models this provider knows about.
    fn model_catalog(&self) -> Vec<ModelEntry>;

    /// Context-length fallback when a model is not in the catalog.
    fn default_context_length(&self) -> u32;

    /// Maximum context length for a model, falling back to the vendor default
    /// for unrecognized ids.
    fn max_context_length(&self, model: Option<&str>) -> u32 {
        model
            .and_then(|id| {
                self.model_catalog()
                    .into_iter()
                    .find(|entry| entry.id == id)
            })
            .map(|entry| entry.context_length)
            .unwrap_or_else(|| self.default_context_length())
    }

    /// Send a conversation and get a reply.
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError>;

    /// Send a conversation plus a tool catalog; the reply may request tool
    /// execution.
    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError>;

    /// Check the stored credential with a minimal real request.
    ///
    /// There is no cheaper vendor-agnostic validation endpoint, so this
    /// issues a 10-token completion and reports the resulting error, if any.
    async fn validate_credential(&self) -> Result<(), ProviderError> {
        let probe = ChatOptions {
            max_tokens: 10,
            ..ChatOptions::default()
        };
        self.chat(&[Message::user("ping")], &probe).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_options_defaults() {
        let options = ChatOptions::default();
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, 2048);
        assert_eq!(options.timeout_seconds, 60);
        assert!(options.model.is_none());
        assert!(options.system_prompt.is_none());
    }

    #[test]
    fn test_chat_result_accessors() {
        let result = ChatResult {
            reply: ChatReply::Content("hello".to_string()),
            usage: Usage::default(),
            model: "m".to_string(),
        };
        assert_eq!(result.content(), Some("hello"));
        assert!(result.tool_calls().is_none());
    }
}
