//! # A.R.E.S Deep Search
//!
//! Recursive, budget-bounded web research driven by LLM relevance scoring.
//!
//! A query is expanded into search keywords, the results are fetched and
//! scored by a language model, promising pages lead to further searches and
//! links, and the best pages found are synthesized into a cited answer.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use deepsearch::{AppState, DeepsearchConfig, cache::ResponseCache};
//! use std::sync::Arc;
//!
//! let config = DeepsearchConfig::load("deepsearch.toml")?;
//! let state = AppState::from_config(config, Arc::new(ResponseCache::in_memory()), None)?;
//!
//! let budget = state.config.research.budget();
//! let report = state.orchestrator.research("benefits of static typing", budget).await?;
//! println!("{}", report.answer);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI-compatible APIs (default) |
//!
//! ## Modules
//!
//! - [`research`] - Orchestrator, research primitives and progress stream
//! - [`oracle`] - Cached, retrying access to the model rotation
//! - [`cache`] - Memoization with write-behind persistence
//! - [`search`] - Search engines and page extraction
//! - [`llm`] - LLM client implementations
//! - [`db`] - libsql-backed durable cache store
//! - [`api`] - HTTP API with SSE progress
//! - [`types`] - Common types and error handling

/// HTTP API handlers and routes.
pub mod api;
/// Memoization of external calls.
pub mod cache;
/// Command-line interface.
pub mod cli;
/// Durable storage (libsql).
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Cached, retrying gateway to the reasoning models.
pub mod oracle;
/// Recursive research orchestration.
pub mod research;
/// Search providers and content extraction.
pub mod search;
/// Core types (budgets, requests, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

pub use llm::{LLMClient, ModelRegistry, Provider};
pub use oracle::{OracleGateway, RetryPolicy};
pub use research::{Orchestrator, ProgressEvent, ProgressStream, ResearchPrimitives};
pub use types::{AppError, Result};
pub use utils::toml_config::{DeepsearchConfig, SearchEngine};

use crate::cache::ResponseCache;
use crate::search::{CachedExtractor, CachedSearch};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration
    pub config: Arc<DeepsearchConfig>,
    /// Oracle gateway shared by every run
    pub gateway: Arc<OracleGateway>,
    /// Research entry point
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Wire the research engine from configuration.
    ///
    /// `engine` overrides `[search] engine` when set. The cache is owned by
    /// the caller, which is responsible for closing it on shutdown.
    pub fn from_config(
        config: DeepsearchConfig,
        cache: Arc<ResponseCache>,
        engine: Option<SearchEngine>,
    ) -> Result<Self> {
        let registry = ModelRegistry::from_config(&config);
        let gateway = Arc::new(OracleGateway::new(
            registry.build_rotation()?,
            config.oracle.retry_policy(),
            Arc::clone(&cache),
        )?);

        let primitives = ResearchPrimitives::new(Arc::clone(&gateway))
            .with_translation_language(config.research.translation_language.clone())
            .with_max_page_chars(config.research.max_page_chars);

        let engine = engine.unwrap_or(config.search.engine);
        let search = Arc::new(CachedSearch::new(
            search::build_search_provider(&config, engine)?,
            Arc::clone(&cache),
        ));
        let extractor = Arc::new(CachedExtractor::new(
            search::build_extractor(&config),
            cache,
        ));

        let orchestrator = Orchestrator::new(primitives, search, extractor)
            .with_max_results(config.search.max_results);

        Ok(Self::new(config, gateway, orchestrator))
    }

    pub fn new(
        config: DeepsearchConfig,
        gateway: Arc<OracleGateway>,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
