//! Configuration system for Storeagent.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Settings key holding the currently selected provider id.
pub const KEY_SELECTED_PROVIDER: &str = "provider.selected";

/// Settings key for a provider's stored (obfuscated) credential.
pub fn credential_key(provider_id: &str) -> String {
    format!("provider.{}.credential", provider_id)
}

/// Host configuration store: a string-valued key→value surface.
///
/// The embedding application supplies the persistent implementation; the core
/// only reads the selected vendor and its stored credential through it.
pub trait SettingsStore: Send + Sync {
    /// Read a value, or `None` if unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str);
}

/// In-memory settings store for tests and embedding without a host backend.
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

/// Main configuration struct for Storeagent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Generation parameters
    pub generation: GenerationConfig,
    /// Tool-loop settings
    #[serde(rename = "loop")]
    pub loop_: LoopConfigSection,
    /// Per-provider obfuscated credentials, keyed by provider id
    pub credentials: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Selected provider id
    pub provider: String,
    /// Selected model id (empty means the provider default)
    pub model: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// HTTP timeout per vendor call, in seconds
    pub timeout_seconds: u64,
    /// System prompt prepended to every conversation
    pub system_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            timeout_seconds: 60,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfigSection {
    /// Maximum model calls per conversation turn before bailing out
    pub max_iterations: usize,
    /// Reserved: parallel execution of independent non-destructive calls.
    /// Not wired; the default contract is sequential execution.
    pub allow_parallel_tools: bool,
}

impl Default for LoopConfigSection {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            allow_parallel_tools: false,
        }
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "generation.max_tokens")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        let config_dir = Self::config_dir();

        Figment::new()
            // Default values
            .merge(figment::providers::Serialized::defaults(Config::default()))
            // User config
            .merge(Toml::file(config_dir.join("config.toml")))
            // Project config
            .merge(Toml::file(".storeagent/config.toml"))
            // Environment variables
            .merge(Env::prefixed("STOREAGENT_").split("_"))
            .extract()
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, Error> {
        let config = Self::load().map_err(|e| Error::Config(e.to_string()))?;
        let result = config.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.general.provider.is_empty() {
            result.add_error("general.provider", "Provider id cannot be empty");
        }

        if self.generation.max_tokens == 0 {
            result.add_error("generation.max_tokens", "max_tokens must be greater than 0");
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            result.add_error(
                "generation.temperature",
                "temperature must be between 0.0 and 2.0",
            );
        }

        if self.generation.timeout_seconds == 0 {
            result.add_error(
                "generation.timeout_seconds",
                "timeout_seconds must be greater than 0",
            );
        }

        if self.loop_.max_iterations == 0 {
            result.add_error("loop.max_iterations", "max_iterations must be greater than 0");
        }

        if self.loop_.max_iterations > 25 {
            result.add_warning(
                "loop.max_iterations",
                "max_iterations is very high, runaway tool loops will be expensive",
            );
        }

        for (provider, credential) in &self.credentials {
            if credential.is_empty() {
                result.add_warning(
                    format!("credentials.{}", provider),
                    "stored credential is an empty string",
                );
            }
        }

        result
    }

    /// Export the provider-selection keys into a settings store.
    pub fn as_settings(&self) -> MemorySettings {
        let settings = MemorySettings::new();
        settings.set(KEY_SELECTED_PROVIDER, &self.general.provider);
        for (provider, credential) in &self.credentials {
            settings.set(&credential_key(provider), credential);
        }
        settings
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("storeagent"))
            .unwrap_or_else(|| PathBuf::from("~/.config/storeagent"))
    }
}
