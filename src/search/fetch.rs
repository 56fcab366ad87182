//! Page fetching and text extraction backed by daedra

use super::ContentExtractor;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use tracing::debug;

/// Fetches a page and converts its main content to markdown text
#[derive(Debug, Default, Clone)]
pub struct DaedraExtractor {
    selector: Option<String>,
}

impl DaedraExtractor {
    pub fn new() -> Self {
        Self { selector: None }
    }

    /// Restrict extraction to elements matching a CSS selector
    pub fn with_selector(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
        }
    }
}

#[async_trait]
impl ContentExtractor for DaedraExtractor {
    async fn fetch_and_extract(&self, url: &str) -> Result<Option<String>> {
        let fetch_args = daedra::VisitPageArgs {
            url: url.to_string(),
            include_images: false,
            selector: self.selector.clone(),
        };

        let page = daedra::tools::fetch::fetch_page(&fetch_args)
            .await
            .map_err(|e| AppError::Extraction(format!("Failed to fetch {}: {}", url, e)))?;

        debug!(url, words = ?page.word_count, "Fetched page");
        Ok(non_empty(page.content.to_string()))
    }

    fn variant(&self) -> Option<&str> {
        self.selector.as_deref()
    }
}

fn non_empty(content: String) -> Option<String> {
    if content.trim().is_empty() {
        None
    } else {
        Some(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_content_is_absent() {
        assert_eq!(non_empty("  \n\t".to_string()), None);
        assert_eq!(non_empty("# Title".to_string()), Some("# Title".to_string()));
    }

    #[test]
    fn test_selector_is_the_variant() {
        assert_eq!(DaedraExtractor::with_selector("article").variant(), Some("article"));
        assert_eq!(DaedraExtractor::new().variant(), None);
    }
}
