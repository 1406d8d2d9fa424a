//! Provider factory with instance caching.
//!
//! Providers are built through registered constructor functions and cached
//! per (provider id, credential) pair, so repeated lookups with the same
//! credential reuse one instance and a credential change produces a fresh
//! one. Credentials read from a settings store are deobfuscated before the
//! builder ever sees them.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use tracing::debug;

use storeagent_core::{credential_key, ProviderError, SettingsStore, KEY_SELECTED_PROVIDER};

use crate::anthropic::AnthropicProvider;
use crate::credential::{obfuscate, reveal};
use crate::deepseek::DeepSeekProvider;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use crate::traits::ChatProvider;
use crate::usage::UsageLedger;
use crate::xai::XaiProvider;

/// Everything a provider constructor needs from the factory.
pub struct ProviderContext {
    pub credential: String,
    pub ledger: Arc<UsageLedger>,
}

/// Constructor function registered per provider id.
pub type ProviderBuilder = fn(ProviderContext) -> Arc<dyn ChatProvider>;

pub struct ProviderFactory {
    builders: HashMap<String, ProviderBuilder>,
    cache: Mutex<HashMap<(String, u64), Arc<dyn ChatProvider>>>,
    ledger: Arc<UsageLedger>,
    secret: String,
}

impl ProviderFactory {
    /// Create an empty factory. `secret` keys credential obfuscation in
    /// the settings store.
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_ledger(secret, Arc::new(UsageLedger::new()))
    }

    /// Create an empty factory recording usage into an existing ledger.
    pub fn with_ledger(secret: impl Into<String>, ledger: Arc<UsageLedger>) -> Self {
        Self {
            builders: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
            ledger,
            secret: secret.into(),
        }
    }

    /// Factory pre-populated with every built-in provider.
    pub fn with_defaults(secret: impl Into<String>) -> Self {
        let mut factory = Self::new(secret);
        factory.register("openai", OpenAiProvider::from_context);
        factory.register("anthropic", AnthropicProvider::from_context);
        factory.register("gemini", GeminiProvider::from_context);
        factory.register("xai", XaiProvider::from_context);
        factory.register("deepseek", DeepSeekProvider::from_context);
        factory
    }

    /// Register a builder for `id`. The first registration wins; a
    /// duplicate is ignored and `false` is returned.
    pub fn register(&mut self, id: impl Into<String>, builder: ProviderBuilder) -> bool {
        let id = id.into();
        if self.builders.contains_key(&id) {
            debug!(provider = %id, "ignoring duplicate provider registration");
            return false;
        }
        self.builders.insert(id, builder);
        true
    }

    /// Registered provider ids, sorted for stable display.
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.builders.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn ledger(&self) -> Arc<UsageLedger> {
        Arc::clone(&self.ledger)
    }

    /// Build or reuse a provider instance for `id` with `credential`.
    pub fn create(
        &self,
        id: &str,
        credential: &str,
    ) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        let builder = self
            .builders
            .get(id)
            .ok_or_else(|| ProviderError::InvalidProvider(id.to_string()))?;

        let key = (id.to_string(), credential_fingerprint(credential));
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(provider) = cache.get(&key) {
            return Ok(Arc::clone(provider));
        }

        let provider = builder(ProviderContext {
            credential: credential.to_string(),
            ledger: Arc::clone(&self.ledger),
        });
        cache.insert(key, Arc::clone(&provider));
        Ok(provider)
    }

    /// Build the provider selected in `store`, deobfuscating its stored
    /// credential.
    pub fn configured(
        &self,
        store: &dyn SettingsStore,
    ) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        let id = store
            .get(KEY_SELECTED_PROVIDER)
            .ok_or_else(|| ProviderError::InvalidProvider("no provider selected".to_string()))?;
        let stored = store
            .get(&credential_key(&id))
            .ok_or_else(|| ProviderError::not_configured(&id))?;
        let credential = reveal(&stored, &self.secret)
            .map_err(|_| ProviderError::not_configured(&id))?;
        self.create(&id, &credential)
    }

    /// Obfuscate and persist a credential for `id`.
    pub fn store_credential(&self, store: &dyn SettingsStore, id: &str, credential: &str) {
        store.set(&credential_key(id), &obfuscate(credential, &self.secret));
    }

    /// Drop cached instances so the next lookup rebuilds them.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

fn credential_fingerprint(credential: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    credential.hash(&mut hasher);
    hasher.finish()
}
