//! Minimal storefront assistant wiring: settings store, provider factory,
//! tool registry, and the tool loop.
//!
//! Needs a real API key:
//!
//! ```sh
//! STOREFRONT_API_KEY=sk-... cargo run --example storefront_chat
//! ```

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use storeagent_agent::{LoopConfig, LoopOutcome, ToolLoop};
use storeagent_core::{Message, MemorySettings, SettingsStore, KEY_SELECTED_PROVIDER};
use storeagent_providers::{ChatOptions, ProviderFactory};
use storeagent_tools::{FnCallback, ToolRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let api_key = match std::env::var("STOREFRONT_API_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("set STOREFRONT_API_KEY to run this example");
            return Ok(());
        }
    };
    let provider_id =
        std::env::var("STOREFRONT_PROVIDER").unwrap_or_else(|_| "openai".to_string());

    // The host would back this with real persistence; the credential is
    // obfuscated on the way in and revealed on the way out.
    let factory = ProviderFactory::with_defaults("storefront-demo-secret");
    let settings = MemorySettings::new();
    settings.set(KEY_SELECTED_PROVIDER, &provider_id);
    factory.store_credential(&settings, &provider_id, &api_key);
    let provider = factory.configured(&settings)?;

    let mut registry = ToolRegistry::new();
    registry.register(
        storeagent_core::ToolDefinition::new("get_order", "Look up an order by id")
            .with_parameters(json!({
                "type": "object",
                "properties": {"order_id": {"type": "integer"}},
                "required": ["order_id"]
            })),
        Arc::new(FnCallback::new(|args| {
            Ok(json!({
                "success": true,
                "order": {
                    "id": args["order_id"],
                    "status": "shipped",
                    "carrier": "DHL"
                }
            }))
        })),
    );
    registry.register(
        storeagent_core::ToolDefinition::new("update_setting", "Change a store setting")
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "settingId": {"type": "string"},
                    "value": {"type": "string"}
                },
                "required": ["settingId", "value"]
            })),
        Arc::new(FnCallback::new(|args| {
            Ok(json!({"success": true, "updated": args["settingId"]}))
        })),
    );

    let tool_loop = ToolLoop::new(provider, Arc::new(registry)).with_config(LoopConfig {
        options: ChatOptions {
            system_prompt: Some(
                "You are a storefront assistant. Use the available tools to answer.".to_string(),
            ),
            ..ChatOptions::default()
        },
        ..LoopConfig::default()
    });

    let outcome = tool_loop
        .run(vec![Message::user("Where is order 42?")])
        .await?;

    match outcome {
        LoopOutcome::Done {
            content,
            tool_results,
        } => {
            println!("assistant: {}", content);
            for executed in tool_results {
                println!("  [tool {} -> {}]", executed.call.name, executed.result.content);
            }
        }
        LoopOutcome::ConfirmationRequired { pending_calls } => {
            println!("confirmation required for:");
            for call in pending_calls {
                println!("  {} {}", call.name, call.arguments);
            }
        }
    }

    for ((provider, day), entry) in factory.ledger().snapshot() {
        println!(
            "usage {} {}: {} requests, {} tokens",
            provider, day, entry.request_count, entry.total_tokens
        );
    }

    Ok(())
}
