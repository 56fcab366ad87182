//! Per-run crawl state shared by concurrent branches

use crate::types::{PageAnalysis, ResearchBudget};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Outcome of offering a page for acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Accepted; carries the new accepted count
    Accepted(usize),
    /// Score below the budget's relevance threshold
    BelowThreshold,
    /// The article cap was already reached
    BudgetFull,
}

/// Crawl state for one research run.
///
/// Both collections sit behind their own mutex; no lock is ever held across
/// an await point, and the two are never held at the same time.
pub struct Session {
    budget: ResearchBudget,
    visited: Mutex<HashSet<String>>,
    accepted: Mutex<Vec<PageAnalysis>>,
}

impl Session {
    pub fn new(budget: ResearchBudget) -> Self {
        Self {
            budget,
            visited: Mutex::new(HashSet::new()),
            accepted: Mutex::new(Vec::new()),
        }
    }

    pub fn budget(&self) -> &ResearchBudget {
        &self.budget
    }

    /// Claim `url` for analysis. Returns false if another branch already has.
    pub fn try_visit(&self, url: &str) -> bool {
        self.visited.lock().insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.lock().contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.lock().len()
    }

    /// Apply the quality gate and the article cap atomically.
    pub fn offer(&self, analysis: PageAnalysis) -> Acceptance {
        if analysis.relevance_score < self.budget.min_relevance {
            return Acceptance::BelowThreshold;
        }
        let mut accepted = self.accepted.lock();
        if accepted.len() >= self.budget.max_articles {
            return Acceptance::BudgetFull;
        }
        accepted.push(analysis);
        Acceptance::Accepted(accepted.len())
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.lock().len()
    }

    pub fn is_full(&self) -> bool {
        self.accepted_count() >= self.budget.max_articles
    }

    /// Accepted articles in acceptance order
    pub fn accepted(&self) -> Vec<PageAnalysis> {
        self.accepted.lock().clone()
    }

    /// Share of the article cap filled so far, in `[0, 1]`
    pub fn fill_ratio(&self) -> f64 {
        let max = self.budget.max_articles.max(1) as f64;
        (self.accepted_count() as f64 / max).min(1.0)
    }
}
