//! CLI module for deepsearch
//!
//! Provides command-line interface parsing for the `deepsearch` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::types::ResearchBudget;
use crate::utils::toml_config::SearchEngine;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// deepsearch - recursive web research driven by LLM relevance scoring
///
/// Expands a query into search keywords, scores the pages it finds with a
/// language model, follows the promising leads and synthesizes a cited
/// answer from the best pages.
#[derive(Parser, Debug)]
#[command(
    name = "deepsearch",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "deepsearch - recursive, budget-bounded web research",
    long_about = "Recursive web research driven by LLM relevance scoring.\n\n\
                  Use 'search' for a one-off run in the terminal, 'serve' to expose the\n\
                  research API over HTTP, or 'init' to scaffold a configuration.",
    after_help = "EXAMPLES:\n    \
                  deepsearch init                                  # Scaffold deepsearch.toml\n    \
                  deepsearch search \"benefits of static typing\"    # Research a question\n    \
                  deepsearch search \"rust async\" --depth 3 --json  # JSON lines output\n    \
                  deepsearch serve                                 # Start the HTTP API\n    \
                  deepsearch --config my.toml models               # List the model rotation"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "deepsearch.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a question and print the answer
    Search(SearchArgs),

    /// Start the HTTP API server
    Serve,

    /// Scaffold deepsearch.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama, openai, or both)
        #[arg(long, default_value = "ollama")]
        provider: String,
    },

    /// Show configuration information
    Config {
        /// Show full configuration details
        #[arg(long)]
        full: bool,

        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// List the oracle model rotation
    Models,
}

/// Per-run overrides for `search`; unset values come from `[research]`.
#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// The question or topic to research
    pub query: String,

    /// Search phrasings to generate from the query
    #[arg(short, long)]
    pub keywords: Option<usize>,

    /// Maximum link depth
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Concurrent searches and concurrent page analyses
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Maximum accepted articles
    #[arg(short, long)]
    pub articles: Option<usize>,

    /// Minimum relevance score (0-10) for a page to be accepted
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub min_relevance: Option<u8>,

    /// Model to start the rotation at
    #[arg(short, long)]
    pub model: Option<String>,

    /// Search engine (duckduckgo or google)
    #[arg(short, long)]
    pub engine: Option<SearchEngine>,

    /// Print progress events as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    /// Apply the overrides to `base`.
    pub fn budget(&self, base: ResearchBudget) -> ResearchBudget {
        ResearchBudget {
            max_keywords: self.keywords.unwrap_or(base.max_keywords),
            max_depth: self.depth.unwrap_or(base.max_depth),
            max_concurrency: self.concurrency.unwrap_or(base.max_concurrency),
            max_articles: self.articles.unwrap_or(base.max_articles),
            min_relevance: self.min_relevance.unwrap_or(base.min_relevance),
        }
    }
}
