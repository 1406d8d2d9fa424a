//! xAI provider for Grok models.
//!
//! xAI exposes an OpenAI-compatible chat-completions endpoint, so this
//! adapter only supplies endpoint, catalog, and identity on top of the
//! shared codec in [`crate::openai`].

use std::sync::Arc;

use async_trait::async_trait;

use storeagent_core::{Message, ProviderError, ToolDefinition};

use crate::factory::ProviderContext;
use crate::openai::OpenAiCompat;
use crate::traits::{ChatOptions, ChatProvider, ChatResult, ModelEntry};
use crate::usage::UsageLedger;

const XAI_API_URL: &str = "https://api.x.ai/v1";

#[derive(Debug)]
pub struct XaiProvider {
    compat: OpenAiCompat,
}

impl XaiProvider {
    pub fn new(api_key: impl Into<String>, ledger: Arc<UsageLedger>) -> Self {
        Self {
            compat: OpenAiCompat::new("xai", api_key, XAI_API_URL, "grok-3", ledger),
        }
    }

    /// Factory builder.
    pub fn from_context(ctx: ProviderContext) -> Arc<dyn ChatProvider> {
        Arc::new(Self::new(ctx.credential, ctx.ledger))
    }
}

#[async_trait]
impl ChatProvider for XaiProvider {
    fn id(&self) -> &str {
        "xai"
    }

    fn display_name(&self) -> &str {
        "xAI"
    }

    fn is_configured(&self) -> bool {
        !self.compat.api_key.is_empty()
    }

    fn model_catalog(&self) -> Vec<ModelEntry> {
        vec![
            ModelEntry {
                id: "grok-3".to_string(),
                display_name: "Grok 3".to_string(),
                context_length: 131_072,
                description: "Flagship Grok model".to_string(),
            },
            ModelEntry {
                id: "grok-3-mini".to_string(),
                display_name: "Grok 3 Mini".to_string(),
                context_length: 131_072,
                description: "Lightweight reasoning model".to_string(),
            },
        ]
    }

    fn default_context_length(&self) -> u32 {
        131_072
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
