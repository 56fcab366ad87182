//! TOML-based configuration for deepsearch
//!
//! Providers, models, the oracle rotation, the search engine and the default
//! research budget are all declared in a single file (`deepsearch.toml`).
//! Secrets never live in the file: providers name the environment variable
//! that holds their key, and `.env` is loaded before validation.

use crate::oracle::RetryPolicy;
use crate::types::{AppError, ResearchBudget};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from deepsearch.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeepsearchConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub research: ResearchConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= Cache Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// libsql database file backing the durable cache layer
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// When false the cache is memory-only and nothing survives a restart
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_cache_path() -> String {
    "./data/deepsearch.db".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            enabled: true,
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,
}

// ============= Oracle Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Model names in rotation order; the first one starts as current
    #[serde(default)]
    pub rotation: Vec<String>,

    #[serde(default = "default_attempts_per_model")]
    pub attempts_per_model: u32,

    /// Pause after a failed attempt
    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,

    /// Extra pause after moving to the next model
    #[serde(default = "default_rotation_pause_ms")]
    pub rotation_pause_ms: u64,

    /// Full passes over the rotation before a dispatch gives up.
    /// `0` retries forever.
    #[serde(default = "default_max_rotations")]
    pub max_rotations: u32,
}

fn default_attempts_per_model() -> u32 {
    2
}

fn default_retry_pause_ms() -> u64 {
    30_000
}

fn default_rotation_pause_ms() -> u64 {
    5_000
}

fn default_max_rotations() -> u32 {
    3
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            rotation: Vec::new(),
            attempts_per_model: default_attempts_per_model(),
            retry_pause_ms: default_retry_pause_ms(),
            rotation_pause_ms: default_rotation_pause_ms(),
            max_rotations: default_max_rotations(),
        }
    }
}

impl OracleConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts_per_model: self.attempts_per_model,
            retry_pause: Duration::from_millis(self.retry_pause_ms),
            rotation_pause: Duration::from_millis(self.rotation_pause_ms),
            max_rotations: (self.max_rotations > 0).then_some(self.max_rotations),
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    DuckDuckGo,
    Google,
}

impl SearchEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::DuckDuckGo => "duckduckgo",
            SearchEngine::Google => "google",
        }
    }
}

impl std::str::FromStr for SearchEngine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(SearchEngine::DuckDuckGo),
            "google" => Ok(SearchEngine::Google),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown search engine '{}' (expected 'duckduckgo' or 'google')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub engine: SearchEngine,

    /// Results requested per search call
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_google_api_key_env")]
    pub google_api_key_env: String,

    #[serde(default = "default_google_engine_id_env")]
    pub google_engine_id_env: String,

    #[serde(default = "default_google_api_base")]
    pub google_api_base: String,

    /// CSS selector limiting page extraction to the matching elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_selector: Option<String>,
}

fn default_max_results() -> usize {
    3
}

fn default_google_api_key_env() -> String {
    "GOOGLE_SEARCH_API_KEY".to_string()
}

fn default_google_engine_id_env() -> String {
    "GOOGLE_SEARCH_ENGINE_ID".to_string()
}

fn default_google_api_base() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: SearchEngine::default(),
            max_results: default_max_results(),
            google_api_key_env: default_google_api_key_env(),
            google_engine_id_env: default_google_engine_id_env(),
            google_api_base: default_google_api_base(),
            content_selector: None,
        }
    }
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_keywords")]
    pub keywords: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    #[serde(default = "default_min_relevance")]
    pub min_relevance: u8,

    /// Page text beyond this many characters is cut before analysis
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,

    /// Language the search phrasings are translated into
    #[serde(default = "default_translation_language")]
    pub translation_language: String,
}

fn default_keywords() -> usize {
    3
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_concurrency() -> usize {
    2
}

fn default_max_articles() -> usize {
    5
}

fn default_min_relevance() -> u8 {
    7
}

fn default_max_page_chars() -> usize {
    12_000
}

fn default_translation_language() -> String {
    "English".to_string()
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            max_depth: default_max_depth(),
            max_concurrency: default_max_concurrency(),
            max_articles: default_max_articles(),
            min_relevance: default_min_relevance(),
            max_page_chars: default_max_page_chars(),
            translation_language: default_translation_language(),
        }
    }
}

impl ResearchConfig {
    /// Default budget for runs that do not override it
    pub fn budget(&self) -> ResearchBudget {
        ResearchBudget {
            max_keywords: self.keywords,
            max_depth: self.max_depth,
            max_concurrency: self.max_concurrency,
            max_articles: self.max_articles,
            min_relevance: self.min_relevance,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by {1} does not exist")]
    MissingModel(String, String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl DeepsearchConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse without validating
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
        }

        if self.oracle.rotation.is_empty() {
            return Err(ConfigError::ValidationError(
                "[oracle] rotation must list at least one model".to_string(),
            ));
        }
        for model_name in &self.oracle.rotation {
            if !self.models.contains_key(model_name) {
                return Err(ConfigError::MissingModel(
                    model_name.clone(),
                    "[oracle] rotation".to_string(),
                ));
            }
        }
        if self.oracle.attempts_per_model == 0 {
            return Err(ConfigError::ValidationError(
                "[oracle] attempts_per_model must be at least 1".to_string(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "[search] max_results must be at least 1".to_string(),
            ));
        }
        if self.search.engine == SearchEngine::Google {
            self.validate_env_var(&self.search.google_api_key_env)?;
            self.validate_env_var(&self.search.google_engine_id_env)?;
        }

        if self.research.max_page_chars == 0 {
            return Err(ConfigError::ValidationError(
                "[research] max_page_chars must be at least 1".to_string(),
            ));
        }
        self.research
            .budget()
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("[research] {}", e)))?;

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        self.resolve_env(name)
            .map(|_| ())
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Google Custom Search credentials (api key, engine id)
    pub fn google_credentials(&self) -> Result<(String, String), ConfigError> {
        let key = self
            .resolve_env(&self.search.google_api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.search.google_api_key_env.clone()))?;
        let engine_id = self
            .resolve_env(&self.search.google_engine_id_env)
            .ok_or_else(|| {
                ConfigError::MissingEnvVar(self.search.google_engine_id_env.clone())
            })?;
        Ok((key, engine_id))
    }
}
