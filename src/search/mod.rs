//! Search and content-extraction collaborators
//!
//! The research engine sees the web through two narrow traits:
//!
//! - [`SearchProvider`]: keyword in, ordered result list out
//! - [`ContentExtractor`]: URL in, readable text (or nothing) out
//!
//! Concrete backends are [`DuckDuckGoSearch`] and [`GoogleSearch`] for
//! search, and [`DaedraExtractor`] for page text. [`CachedSearch`] and
//! [`CachedExtractor`] memoize any implementation through the shared
//! [`ResponseCache`](crate::cache::ResponseCache).

pub mod cached;
pub mod duckduckgo;
pub mod fetch;
pub mod google;

use crate::types::{Result, SearchHit};
use crate::utils::toml_config::{DeepsearchConfig, SearchEngine};
use async_trait::async_trait;
use std::sync::Arc;

pub use cached::{CachedExtractor, CachedSearch};
pub use duckduckgo::DuckDuckGoSearch;
pub use fetch::DaedraExtractor;
pub use google::GoogleSearch;

/// Keyword search over the web.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `max_results` hits for `query`, best first.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// Engine identifier, part of the search cache key
    fn name(&self) -> &str;
}

/// Turns a URL into plain text suitable for analysis.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// `Ok(None)` means the page has no extractable article.
    async fn fetch_and_extract(&self, url: &str) -> Result<Option<String>>;

    /// Extraction setting that changes the text produced for a URL
    fn variant(&self) -> Option<&str> {
        None
    }
}

/// Build the page extractor, honouring `[search] content_selector`.
pub fn build_extractor(config: &DeepsearchConfig) -> Arc<dyn ContentExtractor> {
    match config
        .search
        .content_selector
        .as_deref()
        .map(str::trim)
        .filter(|selector| !selector.is_empty())
    {
        Some(selector) => Arc::new(DaedraExtractor::with_selector(selector)),
        None => Arc::new(DaedraExtractor::new()),
    }
}

/// Build the configured search backend for `engine`.
pub fn build_search_provider(
    config: &DeepsearchConfig,
    engine: SearchEngine,
) -> Result<Arc<dyn SearchProvider>> {
    match engine {
        SearchEngine::DuckDuckGo => Ok(Arc::new(DuckDuckGoSearch::new())),
        SearchEngine::Google => {
            let (api_key, engine_id) = config.google_credentials()?;
            Ok(Arc::new(GoogleSearch::new(
                config.search.google_api_base.clone(),
                api_key,
                engine_id,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_uses_configured_selector() {
        let mut config = DeepsearchConfig::default();
        assert_eq!(build_extractor(&config).variant(), None);

        config.search.content_selector = Some(" main article ".to_string());
        assert_eq!(build_extractor(&config).variant(), Some("main article"));

        config.search.content_selector = Some("   ".to_string());
        assert_eq!(build_extractor(&config).variant(), None);
    }
}
