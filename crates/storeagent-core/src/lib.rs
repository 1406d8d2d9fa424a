//! # storeagent-core
//!
//! Core types and abstractions for Storeagent - the commerce assistant core.
//!
//! This crate provides:
//! - Message and conversation primitives
//! - Tool definitions and invocation types
//! - Configuration system and the host settings-store interface
//! - Common error types

pub mod config;
pub mod error;
pub mod message;
pub mod tool;

pub use config::{credential_key, Config, MemorySettings, SettingsStore, KEY_SELECTED_PROVIDER};
pub use error::{Error, ProviderError, Result};
pub use message::{Message, Role};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
