use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use utoipa::ToSchema;

// ============= Research Budget =============

/// Numeric limits governing a single research run.
///
/// A budget is fixed when the run starts; the orchestrator never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResearchBudget {
    /// Number of search phrasings requested from keyword expansion, and the
    /// number of follow-up keywords/links requested per analyzed page
    pub max_keywords: usize,
    /// Maximum hop depth (keyword -> search is one hop, page -> link is one hop)
    pub max_depth: u32,
    /// Size of each of the two concurrency limiters (search, analyze)
    pub max_concurrency: usize,
    /// Accepted-article cap
    pub max_articles: usize,
    /// Minimum relevance score (0-10) for a page to be accepted
    pub min_relevance: u8,
}

impl Default for ResearchBudget {
    fn default() -> Self {
        Self {
            max_keywords: 3,
            max_depth: 2,
            max_concurrency: 2,
            max_articles: 5,
            min_relevance: 7,
        }
    }
}

impl ResearchBudget {
    /// Reject budgets that cannot produce a terminating, useful run.
    pub fn validate(&self) -> Result<()> {
        if self.max_keywords == 0 {
            return Err(AppError::InvalidInput(
                "max_keywords must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(AppError::InvalidInput(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::InvalidInput(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(AppError::InvalidInput(format!(
                "max_concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_concurrency
            )));
        }
        if self.max_articles == 0 {
            return Err(AppError::InvalidInput(
                "max_articles must be at least 1".to_string(),
            ));
        }
        if self.min_relevance > 10 {
            return Err(AppError::InvalidInput(format!(
                "min_relevance must be between 0 and 10, got {}",
                self.min_relevance
            )));
        }
        Ok(())
    }
}

// ============= Research Data =============

/// A single search-provider result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Output of keyword expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPlan {
    /// The user's query restated as a complete question
    pub full_question: String,
    /// Alternate search phrasings
    pub keywords: Vec<String>,
    /// The phrasings translated into the configured translation language
    pub translated_keywords: Vec<String>,
}

impl KeywordPlan {
    /// Seed keywords for the crawl: phrasings first, then translations,
    /// trimmed and de-duplicated preserving first occurrence.
    pub fn seed_keywords(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.keywords
            .iter()
            .chain(self.translated_keywords.iter())
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(k.to_string()))
            .map(str::to_string)
            .collect()
    }
}

/// The oracle's judgment of one fetched page.
///
/// Produced at most once per URL per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// Relevance to the question and keyword, clamped to 0-10
    pub relevance_score: u8,
    pub follow_up_keywords: Vec<String>,
    pub follow_up_links: Vec<String>,
    /// Verbatim passages useful for the final answer
    pub excerpts: Vec<String>,
    pub source_url: String,
    pub source_keyword: String,
    pub extracted_text: String,
}

/// Final outcome of a run, for callers that do not consume progress.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResearchReport {
    pub answer: String,
    pub sources: Vec<String>,
}

// ============= API Request/Response Types =============

/// Body of `POST /api/research`. Omitted budget fields fall back to the
/// `[research]` section of the configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_articles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_relevance: Option<u8>,
    /// Model to start the oracle rotation at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ResearchRequest {
    /// Overlay the request's explicit fields on a base budget.
    pub fn budget(&self, base: ResearchBudget) -> ResearchBudget {
        ResearchBudget {
            max_keywords: self.keywords.unwrap_or(base.max_keywords),
            max_depth: self.max_depth.unwrap_or(base.max_depth),
            max_concurrency: self.max_concurrency.unwrap_or(base.max_concurrency),
            max_articles: self.max_articles.unwrap_or(base.max_articles),
            min_relevance: self.min_relevance.unwrap_or(base.min_relevance),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModelsResponse {
    /// Rotation order as configured
    pub rotation: Vec<String>,
    /// Model the next oracle dispatch starts with
    pub current: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Database(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::LLM(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Search(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Extraction(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Config(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
