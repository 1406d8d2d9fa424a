//! Tool-invocation loop.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use storeagent_core::{Message, ProviderError, ToolCall, ToolResult};
use storeagent_providers::{ChatOptions, ChatProvider, ChatReply};
use storeagent_tools::ToolRegistry;

/// Knobs for one loop run.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum model calls that may still request tools.
    pub max_iterations: usize,
    /// Whether destructive tools may run without confirmation.
    pub allow_destructive: bool,
    /// Generation options forwarded to every provider call.
    pub options: ChatOptions,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            allow_destructive: false,
            options: ChatOptions::default(),
        }
    }
}

/// A tool call together with what executing it produced.
#[derive(Debug, Clone)]
pub struct ExecutedTool {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// How a loop run ended.
#[derive(Debug)]
pub enum LoopOutcome {
    /// The model answered in plain text.
    Done {
        content: String,
        tool_results: Vec<ExecutedTool>,
    },
    /// The model requested a destructive tool the caller has not
    /// authorized. Nothing was executed; the caller decides whether to
    /// re-run with `allow_destructive` set.
    ConfirmationRequired { pending_calls: Vec<ToolCall> },
}

#[derive(Error, Debug)]
pub enum LoopError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("tool loop exceeded {0} iterations")]
    ToolLoopExceeded(usize),
}

/// Drives a conversation through model calls and tool executions.
pub struct ToolLoop {
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ToolRegistry>,
    config: LoopConfig,
}

impl ToolLoop {
    pub fn new(provider: Arc<dyn ChatProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            config: LoopConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the loop to completion over `conversation`.
    ///
    /// Tools execute sequentially in the order the model requested them;
    /// commerce side effects depend on that ordering. A failing tool does
    /// not abort the run, its error goes back to the model as the tool's
    /// result.
    pub async fn run(&self, mut conversation: Vec<Message>) -> Result<LoopOutcome, LoopError> {
        let catalog = self.registry.definitions();
        let mut tool_results: Vec<ExecutedTool> = Vec::new();

        for iteration in 0..=self.config.max_iterations {
            let result = self
                .provider
                .chat_with_tools(&conversation, &catalog, &self.config.options)
                .await?;

            let calls = match result.reply {
                ChatReply::Content(content) => {
                    return Ok(LoopOutcome::Done {
                        content,
                        tool_results,
                    });
                }
                ChatReply::ToolCalls(calls) => calls,
            };

            if iteration == self.config.max_iterations {
                warn!(
                    iterations = self.config.max_iterations,
                    "model still requesting tools at iteration bound"
                );
                return Err(LoopError::ToolLoopExceeded(self.config.max_iterations));
            }

            if !self.config.allow_destructive {
                if calls
                    .iter()
                    .any(|call| self.registry.is_destructive(&call.name))
                {
                    debug!("destructive tool requested without authorization");
                    return Ok(LoopOutcome::ConfirmationRequired {
                        pending_calls: calls,
                    });
                }
            }

            conversation.push(Message::assistant_tool_calls("", calls.clone()));

            for call in calls {
                debug!(tool = %call.name, id = %call.id, "executing tool call");
                let result = match self.registry.execute(&call.name, &call.arguments).await {
                    Ok(value) => ToolResult::success(&call.id, value.to_string()),
                    Err(e) => {
                        ToolResult::error(&call.id, json!({"error": e.to_string()}).to_string())
                    }
                };
                conversation.push(Message::tool_result(
                    &result.tool_call_id,
                    &result.content,
                ));
                tool_results.push(ExecutedTool { call, result });
            }
        }

        // `0..=max_iterations` always returns from inside the loop.
        Err(LoopError::ToolLoopExceeded(self.config.max_iterations))
    }
}
