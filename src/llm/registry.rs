use std::collections::HashMap;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::errors::{EuporieError, EuporieResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
    llm_config: LlmConfig,
}

impl ProviderRegistry {
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> EuporieResult<Arc<dyn LlmProvider>> {
        self.providers
            .get(&self.active)
            .cloned()
            .ok_or_else(|| EuporieError::Config(format!("Active provider '{}' not found in registry", self.active)))
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// The active provider together with its model settings.
    pub fn active_call(&self) -> EuporieResult<(Arc<dyn LlmProvider>, CallConfig)> {
        let provider = self.get_active()?;
        let (model, temperature) = self
            .llm_config
            .providers
            .get(&self.active)
            .map(|p| (p.model.clone(), p.temperature))
            .unwrap_or_else(|| (String::new(), 0.1));
        tracing::debug!(provider = %self.active, model = %model, "resolved active provider");
        Ok((provider, CallConfig { model, temperature }))
    }

    /// Build a registry from the loaded config.
    /// API keys come from `EUPORIE_<ID>_API_KEY`, then the config entry, then
    /// `OPENAI_API_KEY`.
    pub fn from_config(config: &LlmConfig, client: &reqwest::Client) -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            active: config.active_provider.clone(),
            llm_config: config.clone(),
        };
        for (id, entry) in &config.providers {
            let api_key = std::env::var(format!("EUPORIE_{}_API_KEY", id.to_uppercase()))
                .ok()
                .or_else(|| entry.api_key.clone())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .unwrap_or_default();
            if api_key.is_empty() {
                tracing::warn!(provider = %id, "no API key configured");
            }
            let provider = OpenAiCompatibleProvider::new(
                id.clone(),
                entry.api_base.clone(),
                api_key,
                client.clone(),
            );
            registry.register(Arc::new(provider));
        }
        tracing::info!(
            providers = ?registry.list_names(),
            active = %registry.active,
            "LLM providers registered"
        );
        registry
    }
}
