//! DuckDuckGo search backed by daedra

use super::SearchProvider;
use crate::types::{AppError, Result, SearchHit};
use async_trait::async_trait;
use tracing::debug;

/// Web search through DuckDuckGo
#[derive(Debug, Default, Clone)]
pub struct DuckDuckGoSearch;

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Empty search query".to_string()));
        }

        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: max_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Search(format!("DuckDuckGo search failed: {}", e)))?;

        let hits: Vec<SearchHit> = response
            .data
            .iter()
            .map(|r| SearchHit {
                url: r.url.to_string(),
                title: r.title.to_string(),
                snippet: r.description.to_string(),
            })
            .take(max_results)
            .collect();

        debug!(query, count = hits.len(), "DuckDuckGo search complete");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_query_rejected_without_network() {
        let search = DuckDuckGoSearch::new();
        assert!(matches!(
            search.search("   ", 3).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(search.name(), "duckduckgo");
    }
}
