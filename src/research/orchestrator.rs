//! Crawl orchestrator
//!
//! Drives one research run from query to answer:
//!
//! 1. expand the query into a full question and seed keywords;
//! 2. work through a queue of depth-tagged items, where searching a keyword
//!    yields page items and analyzing a page yields follow-up keyword and
//!    link items;
//! 3. synthesize an answer from the accepted pages.
//!
//! Items run as tasks on a [`JoinSet`]. A finished task hands its children
//! back to the driver, which spawns them, so a branch's progress events always
//! precede those of the branches it spawned and the terminal event follows
//! everything else. Two semaphores, each sized by `max_concurrency`, bound
//! in-flight search calls and in-flight page analyses independently.
//!
//! Termination does not depend on the semaphores: every child is exactly one
//! hop deeper than its parent and nothing deeper than `max_depth` runs.

use super::primitives::ResearchPrimitives;
use super::progress::{ProgressSink, ProgressStream};
use super::session::{Acceptance, Session};
use crate::search::{ContentExtractor, SearchProvider};
use crate::types::{AppError, ResearchBudget, ResearchReport, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

const EVENT_BUFFER: usize = 64;
const DEFAULT_MAX_RESULTS: usize = 3;

/// One unit of crawl work.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WorkItem {
    Search { keyword: String, depth: u32 },
    Analyze { url: String, keyword: String, depth: u32 },
}

impl WorkItem {
    fn depth(&self) -> u32 {
        match self {
            WorkItem::Search { depth, .. } | WorkItem::Analyze { depth, .. } => *depth,
        }
    }
}

/// Entry point for research runs. Cheap to clone; collaborators are shared.
#[derive(Clone)]
pub struct Orchestrator {
    primitives: ResearchPrimitives,
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn ContentExtractor>,
    max_results: usize,
}

/// Everything a task of one run needs.
struct RunContext {
    primitives: ResearchPrimitives,
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn ContentExtractor>,
    max_results: usize,
    session: Session,
    question: String,
    sink: ProgressSink,
    search_limiter: Semaphore,
    analyze_limiter: Semaphore,
}

impl Orchestrator {
    pub fn new(
        primitives: ResearchPrimitives,
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        Self {
            primitives,
            search,
            extractor,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Search hits requested per keyword
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn primitives(&self) -> &ResearchPrimitives {
        &self.primitives
    }

    /// Start a run and return its progress stream.
    ///
    /// Budget and query are checked up front; everything after that is
    /// reported through the stream. Must be called inside a Tokio runtime.
    pub fn run(&self, query: &str, budget: ResearchBudget) -> Result<ProgressStream> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query must not be empty".to_string()));
        }
        budget.validate()?;

        let cancel = CancellationToken::new();
        let (sink, stream) = ProgressStream::channel(EVENT_BUFFER, cancel.clone());
        let orchestrator = self.clone();
        let query = query.to_string();
        let span = info_span!("research", run_id = %Uuid::new_v4());

        tokio::spawn(
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Research run abandoned by caller");
                    }
                    _ = orchestrator.drive(query, budget, sink) => {}
                }
            }
            .instrument(span),
        );

        Ok(stream)
    }

    /// Run to completion and return only the outcome.
    pub async fn research(&self, query: &str, budget: ResearchBudget) -> Result<ResearchReport> {
        self.run(query, budget)?.into_report().await
    }

    async fn drive(self, query: String, budget: ResearchBudget, sink: ProgressSink) {
        match self.crawl(&query, budget, sink.clone()).await {
            Ok(report) => {
                info!(sources = report.sources.len(), "Research run complete");
                sink.done(report).await;
            }
            Err(e) => {
                error!(error = %e, "Research run failed");
                sink.failure(e.to_string()).await;
            }
        }
    }

    async fn crawl(
        self,
        query: &str,
        budget: ResearchBudget,
        sink: ProgressSink,
    ) -> Result<ResearchReport> {
        sink.progress(0.0, "Starting research").await;
        sink.progress(
            0.0,
            format!("Oracle model: {}", self.primitives.gateway().current_model()),
        )
        .await;

        sink.progress(0.1, "Expanding search keywords").await;
        let plan = self
            .primitives
            .expand_keywords(query, budget.max_keywords)
            .await?;
        let mut seeds = plan.seed_keywords();
        if seeds.is_empty() {
            warn!(query, "Keyword expansion produced no keywords, searching the query itself");
            seeds.push(query.to_string());
        }
        sink.progress(0.1, format!("Question: {}", plan.full_question))
            .await;
        sink.progress(0.1, format!("Search keywords: {}", seeds.join(", ")))
            .await;

        let ctx = Arc::new(RunContext {
            primitives: self.primitives,
            search: self.search,
            extractor: self.extractor,
            max_results: self.max_results,
            session: Session::new(budget),
            question: plan.full_question,
            sink: sink.clone(),
            search_limiter: Semaphore::new(budget.max_concurrency),
            analyze_limiter: Semaphore::new(budget.max_concurrency),
        });

        let mut tasks = JoinSet::new();
        for keyword in seeds {
            ctx.spawn(&mut tasks, WorkItem::Search { keyword, depth: 1 });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(children) => {
                    for child in children {
                        ctx.spawn(&mut tasks, child);
                    }
                }
                Err(e) => warn!(error = %e, "Research branch ended abnormally"),
            }
        }

        let accepted = ctx.session.accepted();
        sink.progress(0.8, "Aggregating findings").await;
        sink.progress(
            0.8,
            format!(
                "Accepted articles: {} (pages analyzed: {})",
                accepted.len(),
                ctx.session.visited_count()
            ),
        )
        .await;

        if accepted.is_empty() {
            return Err(AppError::Search(format!(
                "No article reached the relevance threshold of {}",
                budget.min_relevance
            )));
        }

        sink.progress(0.9, "Synthesizing answer").await;
        let answer = ctx
            .primitives
            .synthesize_answer(&ctx.question, &accepted)
            .await?;

        Ok(ResearchReport {
            answer,
            sources: accepted.into_iter().map(|a| a.source_url).collect(),
        })
    }
}

impl RunContext {
    /// Spawn `item` unless its depth or the article cap already rule it out.
    fn spawn(self: &Arc<Self>, tasks: &mut JoinSet<Vec<WorkItem>>, item: WorkItem) {
        if item.depth() > self.session.budget().max_depth || self.session.is_full() {
            return;
        }
        if let WorkItem::Analyze { url, .. } = &item
            && self.session.is_visited(url)
        {
            return;
        }
        let ctx = Arc::clone(self);
        tasks.spawn(async move { ctx.execute(item).await }.in_current_span());
    }

    async fn execute(&self, item: WorkItem) -> Vec<WorkItem> {
        match item {
            WorkItem::Search { keyword, depth } => self.search_and_analyze(keyword, depth).await,
            WorkItem::Analyze {
                url,
                keyword,
                depth,
            } => self.analyze_and_follow(url, keyword, depth).await,
        }
    }

    fn search_fraction(&self) -> f64 {
        0.2 + self.session.fill_ratio() / 2.0
    }

    fn analyze_fraction(&self) -> f64 {
        0.3 + self.session.fill_ratio() / 2.0
    }

    async fn search_and_analyze(&self, keyword: String, depth: u32) -> Vec<WorkItem> {
        let budget = self.session.budget();
        if depth > budget.max_depth || self.session.is_full() {
            return Vec::new();
        }

        self.sink
            .progress(
                self.search_fraction(),
                format!("Searching: {} (depth {})", keyword, depth),
            )
            .await;

        let result = {
            let Ok(_permit) = self.search_limiter.acquire().await else {
                return Vec::new();
            };
            self.search.search(&keyword, self.max_results).await
        };

        let hits = match result {
            Ok(hits) => hits,
            Err(e) => {
                warn!(keyword = %keyword, depth, error = %e, "Search failed");
                self.sink
                    .progress(
                        self.search_fraction(),
                        format!("Search failed: {} - {}", keyword, e),
                    )
                    .await;
                return Vec::new();
            }
        };

        self.sink
            .progress(
                self.search_fraction(),
                format!("Search complete: {} - {} results", keyword, hits.len()),
            )
            .await;

        hits.into_iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .map(|hit| WorkItem::Analyze {
                url: hit.url,
                keyword: keyword.clone(),
                depth: depth + 1,
            })
            .collect()
    }

    async fn analyze_and_follow(&self, url: String, keyword: String, depth: u32) -> Vec<WorkItem> {
        let budget = *self.session.budget();
        if depth > budget.max_depth || self.session.is_full() {
            return Vec::new();
        }
        if !self.session.try_visit(&url) {
            debug!(url = %url, "Already visited");
            return Vec::new();
        }

        self.sink
            .progress(
                self.analyze_fraction(),
                format!("Analyzing: {} (depth {})", url, depth),
            )
            .await;

        let analysis = {
            let Ok(_permit) = self.analyze_limiter.acquire().await else {
                return Vec::new();
            };

            let text = match self.extractor.fetch_and_extract(&url).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    warn!(url = %url, "No extractable text");
                    self.sink
                        .progress(self.analyze_fraction(), format!("Extraction failed: {}", url))
                        .await;
                    return Vec::new();
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Extraction failed");
                    self.sink
                        .progress(
                            self.analyze_fraction(),
                            format!("Extraction failed: {} - {}", url, e),
                        )
                        .await;
                    return Vec::new();
                }
            };

            match self
                .primitives
                .analyze_page(&self.question, &url, &keyword, &text, budget.max_keywords)
                .await
            {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(url = %url, error = %e, "Page analysis failed");
                    self.sink
                        .progress(
                            self.analyze_fraction(),
                            format!("Analysis error: {} - {}", url, e),
                        )
                        .await;
                    return Vec::new();
                }
            }
        };

        let score = analysis.relevance_score;
        let follow_keywords = analysis.follow_up_keywords.clone();
        let follow_links = analysis.follow_up_links.clone();
        let source_keyword = analysis.source_keyword.clone();

        match self.session.offer(analysis) {
            Acceptance::Accepted(count) => {
                info!(url = %url, score, accepted = count, "Article accepted")
            }
            Acceptance::BelowThreshold => debug!(url = %url, score, "Article below threshold"),
            Acceptance::BudgetFull => debug!(url = %url, score, "Article cap already reached"),
        }

        self.sink
            .progress(
                self.analyze_fraction(),
                format!("Analysis complete: {} (score {} / 10)", url, score),
            )
            .await;

        if self.session.is_full() {
            return Vec::new();
        }

        let next_depth = depth + 1;
        follow_keywords
            .into_iter()
            .map(|keyword| WorkItem::Search {
                keyword,
                depth: next_depth,
            })
            .chain(follow_links.into_iter().map(|link| WorkItem::Analyze {
                url: link,
                keyword: source_keyword.clone(),
                depth: next_depth,
            }))
            .collect()
    }
}
