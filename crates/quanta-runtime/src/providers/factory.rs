//! Provider factories for building LLM providers from configuration.
//!
//! New providers register a factory instead of extending an enum. The
//! server resolves the `provider` section of its runtime configuration here:
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.from_settings(&config.provider)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};
use crate::config::ProviderSettings;

/// Builds one kind of provider from its configuration options.
pub trait ProviderFactory: Send + Sync {
    /// Value of `provider.type` this factory answers to, e.g. `"openai"`.
    fn provider_type(&self) -> &'static str;

    /// Reject unusable options. Always called before [`ProviderFactory::create`].
    fn validate_config(&self, options: &JsonValue) -> Result<(), ProviderError>;

    fn create(&self, options: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;
}

/// Provider factories keyed by provider type.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Validate `options` and build a provider of the given type.
    pub fn create(
        &self,
        provider_type: &str,
        options: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })?;
        factory.validate_config(options)?;
        factory.create(options)
    }

    /// Build the provider described by the runtime configuration.
    pub fn from_settings(
        &self,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = self.create(&settings.kind, &settings.options_json())?;
        tracing::info!(provider = provider.name(), "language model provider ready");
        Ok(provider)
    }

    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Registry with every provider compiled into this build.
    #[cfg(feature = "openai")]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::OpenAiProviderFactory));
        registry
    }

    #[cfg(not(feature = "openai"))]
    pub fn with_defaults() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
