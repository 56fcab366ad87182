//! Google Custom Search JSON API

use super::SearchProvider;
use crate::types::{AppError, Result, SearchHit};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// The API returns at most this many items per request
const GOOGLE_MAX_NUM: usize = 10;

/// Web search through a Google Programmable Search Engine
pub struct GoogleSearch {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    engine_id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleSearch {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Empty search query".to_string()));
        }
        let num = max_results.clamp(1, GOOGLE_MAX_NUM).to_string();

        let response = self
            .client
            .get(&self.api_base)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("fields", "items(title,snippet,link)"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Google search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Google search returned {}: {}",
                status, body
            )));
        }

        let parsed: GoogleResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Invalid Google search response: {}", e)))?;

        let hits: Vec<SearchHit> = parsed
            .items
            .into_iter()
            .map(|item| SearchHit {
                url: item.link,
                title: item.title,
                snippet: item.snippet,
            })
            .take(max_results)
            .collect();

        debug!(query, count = hits.len(), "Google search complete");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "google"
    }
}
