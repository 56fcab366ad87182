//! Scripted collaborators for research tests.
//!
//! [`MockOracle`] answers the three research prompts from a script keyed by
//! page URL, [`MockSearch`] maps keywords to URLs and [`MockExtractor`] maps
//! URLs to page text. Each one records what it was asked so tests can check
//! call counts and visit order.

#![allow(dead_code)]

use async_trait::async_trait;
use deepsearch::cache::ResponseCache;
use deepsearch::llm::LLMClient;
use deepsearch::oracle::{OracleGateway, RetryPolicy};
use deepsearch::research::{Orchestrator, ProgressEvent, ProgressStream, ResearchPrimitives};
use deepsearch::search::{ContentExtractor, SearchProvider};
use deepsearch::types::{AppError, Result, SearchHit};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the oracle says about one page.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub score: u8,
    pub keywords: Vec<String>,
    pub links: Vec<String>,
}

impl PageScript {
    pub fn scored(score: u8) -> Self {
        Self {
            score,
            ..Default::default()
        }
    }

    pub fn linking(score: u8, links: &[impl AsRef<str>]) -> Self {
        Self {
            score,
            keywords: vec![],
            links: links.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }
}

/// Oracle that answers by inspecting the rendered prompt.
pub struct MockOracle {
    keywords: Vec<String>,
    translations: Vec<String>,
    pages: HashMap<String, PageScript>,
    fan_out: bool,
    failing: bool,
    misshaped_plans: AtomicUsize,
    calls: AtomicUsize,
    analyzed: Mutex<Vec<String>>,
    syntheses: Mutex<Vec<String>>,
}

impl MockOracle {
    /// Oracle whose keyword expansion proposes `keywords`.
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            translations: vec![],
            pages: HashMap::new(),
            fan_out: false,
            failing: false,
            misshaped_plans: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            analyzed: Mutex::new(Vec::new()),
            syntheses: Mutex::new(Vec::new()),
        }
    }

    /// Oracle that fails every call.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(&[])
        }
    }

    pub fn with_translations(mut self, translations: &[&str]) -> Self {
        self.translations = translations.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_page(mut self, url: &str, script: PageScript) -> Self {
        self.pages.insert(url.to_string(), script);
        self
    }

    /// Unscripted pages score 3 and link to two fresh child pages.
    pub fn with_fan_out(mut self) -> Self {
        self.fan_out = true;
        self
    }

    /// The first `count` keyword expansions reply with a null question.
    pub fn with_misshaped_plans(self, count: usize) -> Self {
        self.misshaped_plans.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs in the order their analysis was requested
    pub fn analyzed(&self) -> Vec<String> {
        self.analyzed.lock().clone()
    }

    /// Rendered synthesis prompts
    pub fn syntheses(&self) -> Vec<String> {
        self.syntheses.lock().clone()
    }

    fn page_reply(&self, url: &str) -> String {
        let script = match self.pages.get(url) {
            Some(script) => script.clone(),
            None if self.fan_out => {
                PageScript::linking(3, &[format!("{}/1", url), format!("{}/2", url)])
            }
            None => PageScript::default(),
        };
        json!({
            "relevance": script.score,
            "follow_up_keywords": script.keywords,
            "follow_up_links": script.links,
            "excerpts": [format!("Excerpt from {}", url)],
        })
        .to_string()
    }
}

fn article_url(system: &str) -> Option<String> {
    let start = system.find("```article\nURL: ")? + "```article\nURL: ".len();
    let rest = &system[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

#[async_trait]
impl LLMClient for MockOracle {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(AppError::LLM("Mock oracle unavailable".to_string()));
        }

        if system.contains("search keyword phrases") {
            let misshaped = self
                .misshaped_plans
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if misshaped {
                return Ok(json!({
                    "full_question": null,
                    "search_keywords": self.keywords,
                })
                .to_string());
            }
            return Ok(json!({
                "full_question": format!("What are the {}?", prompt),
                "search_keywords": self.keywords,
                "translated_keywords": self.translations,
            })
            .to_string());
        }

        if let Some(url) = article_url(system) {
            self.analyzed.lock().push(url.clone());
            return Ok(format!("```json\n{}\n```", self.page_reply(&url)));
        }

        if prompt.contains("found these articles") {
            self.syntheses.lock().push(prompt.to_string());
            let cited: Vec<&str> = prompt
                .lines()
                .filter_map(|line| line.strip_prefix("URL: "))
                .collect();
            return Ok(format!(
                "Static typing catches errors early. Sources: {}",
                cited.join(", ")
            ));
        }

        Err(AppError::LLM("Unexpected prompt".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock-oracle"
    }
}

/// Search engine backed by a keyword -> URLs table.
#[derive(Default)]
pub struct MockSearch {
    results: HashMap<String, Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, keyword: &str, urls: &[impl AsRef<str>]) -> Self {
        self.results.insert(
            keyword.to_string(),
            urls.iter().map(|u| u.as_ref().to_string()).collect(),
        );
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.queries.lock().push(query.to_string());
        let urls = self.results.get(query).cloned().unwrap_or_default();
        Ok(urls
            .into_iter()
            .take(max_results)
            .map(|url| SearchHit {
                title: format!("Title of {}", url),
                snippet: String::new(),
                url,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Extractor that returns generated text for every URL except the blank ones.
#[derive(Default)]
pub struct MockExtractor {
    blank: Vec<String>,
    delay: Option<Duration>,
    fetched: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `url` yields no extractable text.
    pub fn with_blank(mut self, url: &str) -> Self {
        self.blank.push(url.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs in fetch order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl ContentExtractor for MockExtractor {
    async fn fetch_and_extract(&self, url: &str) -> Result<Option<String>> {
        self.fetched.lock().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.blank.iter().any(|b| b == url) {
            return Ok(None);
        }
        Ok(Some(format!("Article text of {}", url)))
    }
}

/// Retry policy that gives up after one pass with 1ms pauses.
pub fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        attempts_per_model: 2,
        retry_pause: Duration::from_millis(1),
        rotation_pause: Duration::from_millis(1),
        max_rotations: Some(1),
    }
}

pub fn gateway(oracle: Arc<MockOracle>, policy: RetryPolicy) -> Arc<OracleGateway> {
    let client: Arc<dyn LLMClient> = oracle;
    let slots = vec![("mock".to_string(), client)];
    Arc::new(
        OracleGateway::new(slots, policy, Arc::new(ResponseCache::in_memory()))
            .expect("valid gateway"),
    )
}

pub fn orchestrator(
    oracle: Arc<MockOracle>,
    search: Arc<MockSearch>,
    extractor: Arc<MockExtractor>,
    policy: RetryPolicy,
) -> Orchestrator {
    let primitives = ResearchPrimitives::new(gateway(oracle, policy));
    Orchestrator::new(primitives, search, extractor).with_max_results(3)
}

/// Drain a run, failing the test if it does not end within ten seconds.
pub async fn collect(stream: ProgressStream) -> Vec<ProgressEvent> {
    tokio::time::timeout(Duration::from_secs(10), stream.collect::<Vec<_>>())
        .await
        .expect("research run did not terminate")
}
