//! # storeagent-providers
//!
//! Multi-vendor chat abstraction layer for Storeagent.
//!
//! This crate provides:
//! - The [`ChatProvider`] trait abstracting vendor chat APIs
//! - Adapters for OpenAI, Anthropic, Google Gemini, xAI, and DeepSeek
//! - Tool-calling normalization across vendors
//! - A caching provider factory driven by host configuration
//! - Per-vendor, per-day usage accounting

pub mod anthropic;
pub mod credential;
pub mod deepseek;
pub mod factory;
pub mod gemini;
pub mod openai;
pub mod traits;
pub mod usage;
pub mod xai;

pub use anthropic::AnthropicProvider;
pub use deepseek::DeepSeekProvider;
pub use factory::{ProviderBuilder, ProviderContext, ProviderFactory};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use traits::{ChatOptions, ChatProvider, ChatReply, ChatResult, ModelEntry, Usage};
pub use usage::{UsageEntry, UsageLedger};
pub use xai::XaiProvider;
