//! End-to-end loop behavior against scripted providers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use storeagent_agent::{LoopConfig, LoopError, LoopOutcome, ToolLoop};
use storeagent_core::{Message, ProviderError, ToolCall, ToolDefinition};
use storeagent_providers::{
    ChatOptions, ChatProvider, ChatReply, ChatResult, ModelEntry, Usage,
};
use storeagent_tools::{FnCallback, ToolRegistry};

/// Provider that plays back a fixed sequence of replies.
#[derive(Debug)]
struct ScriptedProvider {
    replies: Mutex<VecDeque<ChatReply>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(replies: Vec<ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn model_catalog(&self) -> Vec<ModelEntry> {
        Vec::new()
    }

    fn default_context_length(&self) -> u32 {
        8_192
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.chat_with_tools(messages, &[], options).await
    }

    async fn chat_with_tools(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatReply::Content("done".to_string()));
        Ok(ChatResult {
            reply,
            usage: Usage::default(),
            model: "scripted-1".to_string(),
        })
    }
}

/// Provider that requests the same tool on every call.
#[derive(Debug)]
struct AlwaysToolsProvider {
    calls: AtomicUsize,
}

impl AlwaysToolsProvider {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatProvider for AlwaysToolsProvider {
    fn id(&self) -> &str {
        "relentless"
    }

    fn display_name(&self) -> &str {
        "Relentless"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn model_catalog(&self) -> Vec<ModelEntry> {
        Vec::new()
    }

    fn default_context_length(&self) -> u32 {
        8_192
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        self.chat_with_tools(messages, &[], options).await
    }

    async fn chat_with_tools(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _options: &ChatOptions,
    ) -> Result<ChatResult, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ChatResult {
            reply: ChatReply::ToolCalls(vec![ToolCall::new(
                format!("call_{}", n),
                "get_order",
                json!({"order_id": n}),
            )]),
            usage: Usage::default(),
            model: "relentless-1".to_string(),
        })
    }
}

fn registry_with_get_order(executions: Arc<AtomicUsize>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("get_order", "Look up an order"),
        Arc::new(FnCallback::new(move |args| {
            executions.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"success": true, "order": args}))
        })),
    );
    registry
}

#[tokio::test]
async fn plain_answer_completes_without_tools() {
    let provider = Arc::new(ScriptedProvider::new(vec![ChatReply::Content(
        "We ship worldwide.".to_string(),
    )]));
    let registry = Arc::new(registry_with_get_order(Arc::new(AtomicUsize::new(0))));
    let tool_loop = ToolLoop::new(provider.clone(), registry);

    let outcome = tool_loop
        .run(vec![Message::user("do you ship to France?")])
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Done {
            content,
            tool_results,
        } => {
            assert_eq!(content, "We ship worldwide.");
            assert!(tool_results.is_empty());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn destructive_call_yields_confirmation_required() {
    let executed = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    let counter = executed.clone();
    registry.register(
        ToolDefinition::new("refund_order", "Refund an order").destructive(),
        Arc::new(FnCallback::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"success": true}))
        })),
    );

    let provider = Arc::new(ScriptedProvider::new(vec![ChatReply::ToolCalls(vec![
        ToolCall::new("call_1", "refund_order", json!({"order_id": 9})),
    ])]));
    let tool_loop = ToolLoop::new(provider, Arc::new(registry));

    let outcome = tool_loop
        .run(vec![Message::user("refund order 9")])
        .await
        .unwrap();

    match outcome {
        LoopOutcome::ConfirmationRequired { pending_calls } => {
            assert_eq!(pending_calls.len(), 1);
            assert_eq!(pending_calls[0].name, "refund_order");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn authorized_destructive_call_executes() {
    let executed = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    let counter = executed.clone();
    registry.register(
        ToolDefinition::new("refund_order", "Refund an order").destructive(),
        Arc::new(FnCallback::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"success": true}))
        })),
    );

    let provider = Arc::new(ScriptedProvider::new(vec![
        ChatReply::ToolCalls(vec![ToolCall::new(
            "call_1",
            "refund_order",
            json!({"order_id": 9}),
        )]),
        ChatReply::Content("Refund issued.".to_string()),
    ]));
    let tool_loop = ToolLoop::new(provider, Arc::new(registry)).with_config(LoopConfig {
        allow_destructive: true,
        ..LoopConfig::default()
    });

    let outcome = tool_loop
        .run(vec![Message::user("refund order 9")])
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Done { content, .. } => assert_eq!(content, "Refund issued."),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn relentless_tool_calls_hit_iteration_bound() {
    let executions = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(registry_with_get_order(executions.clone()));
    let provider = Arc::new(AlwaysToolsProvider::new());
    let tool_loop = ToolLoop::new(provider, registry).with_config(LoopConfig {
        max_iterations: 3,
        ..LoopConfig::default()
    });

    let err = tool_loop
        .run(vec![Message::user("loop forever")])
        .await
        .unwrap_err();

    assert!(matches!(err, LoopError::ToolLoopExceeded(3)));
    // Three tool rounds ran before the bound tripped.
    assert_eq!(executions.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failing_tool_feeds_error_back_to_model() {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("get_order", "Look up an order"),
        Arc::new(FnCallback::new(|_| {
            anyhow::bail!("order service unavailable")
        })),
    );

    let provider = Arc::new(ScriptedProvider::new(vec![
        ChatReply::ToolCalls(vec![ToolCall::new(
            "call_1",
            "get_order",
            json!({"order_id": 4}),
        )]),
        ChatReply::Content("I couldn't reach the order service.".to_string()),
    ]));
    let tool_loop = ToolLoop::new(provider, Arc::new(registry));

    let outcome = tool_loop
        .run(vec![Message::user("where is order 4?")])
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Done {
            content,
            tool_results,
        } => {
            assert_eq!(content, "I couldn't reach the order service.");
            assert_eq!(tool_results.len(), 1);
            assert!(tool_results[0].result.is_error);
            assert!(tool_results[0].result.content.contains("unavailable"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn update_setting_scenario_round_trips() {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("update_setting", "Change a store setting").with_parameters(json!({
            "type": "object",
            "properties": {
                "settingId": {"type": "string"},
                "value": {"type": "string"}
            },
            "required": ["settingId", "value"]
        })),
        Arc::new(FnCallback::new(|args| {
            assert_eq!(args["settingId"], "guest_checkout");
            assert_eq!(args["value"], "no");
            Ok(json!({"success": true}))
        })),
    );

    let provider = Arc::new(ScriptedProvider::new(vec![
        ChatReply::ToolCalls(vec![ToolCall::new(
            "call_1",
            "update_setting",
            json!({"settingId": "guest_checkout", "value": "no"}),
        )]),
        ChatReply::Content("Guest checkout is now disabled.".to_string()),
    ]));
    let tool_loop = ToolLoop::new(provider.clone(), Arc::new(registry));

    let outcome = tool_loop
        .run(vec![Message::user("disable guest checkout")])
        .await
        .unwrap();

    match outcome {
        LoopOutcome::Done {
            content,
            tool_results,
        } => {
            assert_eq!(content, "Guest checkout is now disabled.");
            assert_eq!(tool_results.len(), 1);
            assert_eq!(tool_results[0].call.name, "update_setting");
            assert!(!tool_results[0].result.is_error);
            assert!(tool_results[0].result.content.contains("success"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(provider.call_count(), 2);
}
