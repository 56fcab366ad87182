//! Memoizing wrappers for search and extraction
//!
//! Search results are keyed on (engine, query, max_results) and page text on
//! the URL plus the extractor's selector. An absent page is cached too, so a dead link is fetched once.
//! Errors are never cached.

use super::{ContentExtractor, SearchProvider};
use crate::cache::{ResponseCache, compute_key};
use crate::types::{Result, SearchHit};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CachedSearch {
    inner: Arc<dyn SearchProvider>,
    cache: Arc<ResponseCache>,
}

impl CachedSearch {
    pub fn new(inner: Arc<dyn SearchProvider>, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl SearchProvider for CachedSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        let key = compute_key(
            "search",
            &[self.inner.name(), query, &max_results.to_string()],
        );

        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_value::<Vec<SearchHit>>(cached) {
                Ok(hits) => {
                    debug!(query, "Search results served from cache");
                    return Ok(hits);
                }
                Err(e) => warn!(query, error = %e, "Ignoring unreadable cached search results"),
            }
        }

        let hits = self.inner.search(query, max_results).await?;
        match serde_json::to_value(&hits) {
            Ok(value) => self.cache.put(&key, value),
            Err(e) => warn!(query, error = %e, "Failed to serialize search results for caching"),
        }
        Ok(hits)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

pub struct CachedExtractor {
    inner: Arc<dyn ContentExtractor>,
    cache: Arc<ResponseCache>,
}

impl CachedExtractor {
    pub fn new(inner: Arc<dyn ContentExtractor>, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ContentExtractor for CachedExtractor {
    async fn fetch_and_extract(&self, url: &str) -> Result<Option<String>> {
        let key = compute_key("page", &[url, self.inner.variant().unwrap_or_default()]);

        match self.cache.get(&key).await {
            Some(Value::String(text)) => return Ok(Some(text)),
            Some(Value::Null) => return Ok(None),
            Some(other) => warn!(url, kind = ?other, "Ignoring unexpected cached page value"),
            None => {}
        }

        let text = self.inner.fetch_and_extract(url).await?;
        let value = text.clone().map(Value::String).unwrap_or(Value::Null);
        self.cache.put(&key, value);
        Ok(text)
    }
}
