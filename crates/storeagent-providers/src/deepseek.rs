//! DeepSeek provider.
//!
//! DeepSeek's API is OpenAI-compatible; this adapter reuses the shared
//! codec in [`crate::openai`] with its own endpoint and catalog.

use std::sync::Arc;

use async_trait::async_trait;

use storeagent_core::{Message, ProviderError, ToolDefinition};

use crate::factory::ProviderContext;
use crate::openai::OpenAiCompat;
use crate::traits::{ChatOptions, ChatProvider, ChatResult, ModelEntry};
use crate::usage::UsageLedger;

const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1";

#[derive(Debug)]
pub struct DeepSeekProvider {
    compat: OpenAiCompat,
}

impl DeepSeekProvider {
    pub fn new(api_key: impl Into<String>, ledger: Arc<UsageLedger>) -> Self {
        Self {
            compat: OpenAiCompat::new(
                "deepseek",
                api_key,
                DEEPSEEK_API_URL,
                "deepseek-chat",
                ledger,
            ),
        }
    }

    /// Factory builder.
    pub fn from_context(ctx: ProviderContext) -> Arc<dyn ChatProvider> {
        Arc::new(Self::new(ctx.credential, ctx.ledger))
    }
}

#[async_trait]
impl ChatProvider for DeepSeekProvider {
    fn id(&self) -> &str {
        "deepseek"
    }

    fn display_name(&self) -> &str {
        "DeepSeek"
    }

    fn is_configured(&self) -> bool {
        !self.compat.api_key.is_empty()
    }

    fn model_catalog(&self) -> Vec<ModelEntry> {
        vec![
            ModelEntry {
                id: "deepseek-chat".to_string(),
                display_name: "DeepSeek Chat".to_string(),
                context_length: 65_536,
                description: "General-purpose chat model".to_string(),
            },
            ModelEntry {
                id: "deepseek-reasoner".to_string(),
                display_name: "DeepSeek Reasoner".to_string(),
                context_length: 65_536,
                description: "Chain-of-thought reasoning model".to_string(),
            },
        ]
    }

    fn default_context_length(&self) -> u32 {
        65_536
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
