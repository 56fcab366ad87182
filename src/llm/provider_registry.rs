//! Model registry for the oracle rotation
//!
//! Resolves the `[models]` / `[providers]` chain from configuration and
//! builds one client per model in `[oracle] rotation`, in order.

use crate::llm::client::{LLMClient, Provider};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{DeepsearchConfig, ModelConfig, ProviderConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// A configured model paired with its client
pub type RotationSlot = (String, Arc<dyn LLMClient>);

/// Registry of named models and the providers that serve them
pub struct ModelRegistry {
    providers: HashMap<String, ProviderConfig>,
    models: HashMap<String, ModelConfig>,
    rotation: Vec<String>,
}

impl ModelRegistry {
    pub fn from_config(config: &DeepsearchConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            models: config.models.clone(),
            rotation: config.oracle.rotation.clone(),
        }
    }

    /// Model names in rotation order
    pub fn rotation(&self) -> &[String] {
        &self.rotation
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Resolve a model name to a concrete provider description
    ///
    /// API keys are read from the environment at this point.
    pub fn provider_for(&self, model_name: &str) -> Result<Provider> {
        let model_config = self.models.get(model_name).ok_or_else(|| {
            AppError::Config(format!("Model '{}' not found in configuration", model_name))
        })?;

        let provider_config = self.providers.get(&model_config.provider).ok_or_else(|| {
            AppError::Config(format!(
                "Provider '{}' referenced by model '{}' not found",
                model_config.provider, model_name
            ))
        })?;

        match provider_config {
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Config(format!(
                        "Environment variable '{}' for model '{}' is not set",
                        api_key_env, model_name
                    ))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model_config.model.clone(),
                })
            }
            ProviderConfig::Ollama { base_url } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model_config.model.clone(),
            }),
        }
    }

    /// Create an LLM client for a specific model by name
    pub fn create_client_for_model(&self, model_name: &str) -> Result<Arc<dyn LLMClient>> {
        let provider = self.provider_for(model_name)?;
        Ok(Arc::from(provider.create_client()?))
    }

    /// Build one client per rotation entry, preserving order
    pub fn build_rotation(&self) -> Result<Vec<RotationSlot>> {
        if self.rotation.is_empty() {
            return Err(AppError::Config(
                "Oracle rotation is empty; add model names to [oracle] rotation".to_string(),
            ));
        }
        self.rotation
            .iter()
            .map(|name| Ok((name.clone(), self.create_client_for_model(name)?)))
            .collect()
    }
}
