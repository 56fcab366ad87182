//! Oracle-backed research primitives
//!
//! Each operation renders a prompt, sends it through the shared
//! [`OracleGateway`] and shapes the reply. Because the gateway caches on the
//! rendered prompt, calling a primitive twice with the same inputs costs one
//! model dispatch.

use super::prompts;
use crate::oracle::{OracleGateway, OracleRequest};
use crate::types::{KeywordPlan, PageAnalysis, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_MAX_PAGE_CHARS: usize = 12_000;

/// Keyword expansion, page analysis and answer synthesis.
#[derive(Clone)]
pub struct ResearchPrimitives {
    gateway: Arc<OracleGateway>,
    translation_language: String,
    max_page_chars: usize,
}

impl ResearchPrimitives {
    pub fn new(gateway: Arc<OracleGateway>) -> Self {
        Self {
            gateway,
            translation_language: "English".to_string(),
            max_page_chars: DEFAULT_MAX_PAGE_CHARS,
        }
    }

    pub fn with_translation_language(mut self, language: impl Into<String>) -> Self {
        self.translation_language = language.into();
        self
    }

    pub fn with_max_page_chars(mut self, max_page_chars: usize) -> Self {
        self.max_page_chars = max_page_chars.max(1);
        self
    }

    pub fn gateway(&self) -> &Arc<OracleGateway> {
        &self.gateway
    }

    /// Restate `query` as a full question and propose `count` search phrasings
    /// plus their translations.
    pub async fn expand_keywords(&self, query: &str, count: usize) -> Result<KeywordPlan> {
        let request = OracleRequest::structured(
            prompts::expand_keywords_system(count, &self.translation_language),
            query,
        );
        let raw: RawKeywordPlan = self.structured(&request).await?;

        let full_question = if raw.full_question.trim().is_empty() {
            query.trim().to_string()
        } else {
            raw.full_question.trim().to_string()
        };

        Ok(KeywordPlan {
            full_question,
            keywords: raw.search_keywords,
            translated_keywords: raw.translated_keywords,
        })
    }

    /// Score `text` (fetched from `url`) against the question and keyword and
    /// pull out follow-up leads and supporting excerpts.
    pub async fn analyze_page(
        &self,
        question: &str,
        url: &str,
        keyword: &str,
        text: &str,
        count: usize,
    ) -> Result<PageAnalysis> {
        let text = truncate_chars(text, self.max_page_chars);
        let request = OracleRequest::structured(
            prompts::analyze_page_system(question, keyword, url, text, count),
            url,
        );
        let raw: RawPageAnalysis = self.structured(&request).await?;

        Ok(PageAnalysis {
            relevance_score: raw.relevance,
            follow_up_keywords: raw.follow_up_keywords.into_iter().take(count).collect(),
            follow_up_links: raw
                .follow_up_links
                .into_iter()
                .filter(|link| is_followable(link))
                .take(count)
                .collect(),
            excerpts: raw.excerpts,
            source_url: url.to_string(),
            source_keyword: keyword.to_string(),
            extracted_text: text.to_string(),
        })
    }

    /// Compose the final answer from accepted articles' excerpts.
    pub async fn synthesize_answer(
        &self,
        question: &str,
        articles: &[PageAnalysis],
    ) -> Result<String> {
        let request =
            OracleRequest::text(String::new(), prompts::synthesize_answer_user(question, articles));
        let response = self.gateway.invoke(&request).await?;
        Ok(response.raw_text.trim().to_string())
    }

    async fn structured<T: DeserializeOwned>(&self, request: &OracleRequest) -> Result<T> {
        self.gateway.invoke_as(request).await
    }
}

/// Cut `text` to at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Only absolute http(s) URLs are worth fetching.
fn is_followable(link: &str) -> bool {
    reqwest::Url::parse(link.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

// ============= Reply shapes =============
//
// Models are sloppy about types: scores arrive as "8", 8.0 or "8/10", lists
// as a single string. Deserialization here accepts all of those.

#[derive(Debug, Default, Deserialize)]
struct RawKeywordPlan {
    #[serde(default, alias = "fulltext question", alias = "question")]
    full_question: String,
    #[serde(
        default,
        alias = "search words",
        alias = "keywords",
        deserialize_with = "string_list"
    )]
    search_keywords: Vec<String>,
    #[serde(
        default,
        alias = "search words english translation",
        alias = "translations",
        deserialize_with = "string_list"
    )]
    translated_keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPageAnalysis {
    #[serde(
        default,
        alias = "Relevance rating",
        alias = "relevance_score",
        alias = "score",
        deserialize_with = "score"
    )]
    relevance: u8,
    #[serde(
        default,
        alias = "Keywords to research",
        deserialize_with = "string_list"
    )]
    follow_up_keywords: Vec<String>,
    #[serde(
        default,
        alias = "Related links to explore",
        alias = "links",
        deserialize_with = "string_list"
    )]
    follow_up_links: Vec<String>,
    #[serde(
        default,
        alias = "Excerpted articles",
        deserialize_with = "string_list"
    )]
    excerpts: Vec<String>,
}

fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

fn score<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    Ok(raw.round().clamp(0.0, 10.0) as u8)
}
