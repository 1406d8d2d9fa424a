//! Error types for Storeagent.
//!
//! Adapters and the factory return these as values rather than panicking
//! across the provider boundary, so the tool-invocation loop can branch on
//! them without exception-style control flow.

use thiserror::Error;

/// Result type alias using the Storeagent error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Storeagent.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider error with structured details
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Tool registry or execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Provider-specific errors with detailed context.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No credential is stored for the provider
    #[error("Provider '{provider}' is not configured")]
    NotConfigured { provider: String },

    /// Unknown provider id passed to the factory
    #[error("Unknown provider: '{0}'")]
    InvalidProvider(String),

    /// Non-2xx HTTP response from the vendor
    #[error("API request to {provider} failed: {status} - {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
        raw_body: String,
    },

    /// 2xx response missing expected fields - a vendor contract violation,
    /// never retried
    #[error("Invalid response from {provider}: {detail}")]
    InvalidResponse { provider: String, detail: String },

    /// Transport failure or timeout
    #[error("Network error connecting to {provider}: {message}")]
    Network { provider: String, message: String },
}

impl ProviderError {
    /// Create a not-configured error.
    pub fn not_configured(provider: impl Into<String>) -> Self {
        ProviderError::NotConfigured {
            provider: provider.into(),
        }
    }

    /// Create an API error from a status code and the raw vendor body.
    ///
    /// The message is taken from the vendor's embedded error message when the
    /// body carries one, else a generic "status N" message.
    pub fn api_error(provider: impl Into<String>, status: u16, raw_body: String) -> Self {
        let message = extract_vendor_message(&raw_body)
            .unwrap_or_else(|| format!("status {}", status));
        ProviderError::ApiError {
            provider: provider.into(),
            status,
            message,
            raw_body,
        }
    }

    /// Create an invalid-response error.
    pub fn invalid_response(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    /// Create a network error.
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Pull the human-readable message out of a vendor error payload.
///
/// Vendors embed it at different depths: OpenAI-family under
/// `error.message`, Anthropic under `error.message`, Gemini under
/// `error.message` as well but sometimes as a bare `message`.
fn extract_vendor_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}
