//! Command-line parsing tests.

use clap::Parser;
use deepsearch::SearchEngine;
use deepsearch::cli::{Cli, Commands};
use deepsearch::types::ResearchBudget;
use rstest::rstest;
use std::path::PathBuf;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("deepsearch").chain(args.iter().copied()))
        .expect("arguments parse")
}

#[test]
fn test_search_defaults() {
    let cli = parse(&["search", "benefits of static typing"]);

    assert_eq!(cli.config, PathBuf::from("deepsearch.toml"));
    assert!(!cli.verbose);
    let Commands::Search(args) = cli.command else {
        panic!("expected search");
    };
    assert_eq!(args.query, "benefits of static typing");
    assert!(!args.json);
    assert_eq!(args.engine, None);

    let base = ResearchBudget::default();
    assert_eq!(args.budget(base), base);
}

#[test]
fn test_search_overrides_budget() {
    let cli = parse(&[
        "--config",
        "custom.toml",
        "search",
        "rust async",
        "--keywords",
        "4",
        "--depth",
        "3",
        "--concurrency",
        "5",
        "--articles",
        "8",
        "--min-relevance",
        "6",
        "--model",
        "cloud",
        "--engine",
        "google",
        "--json",
    ]);

    assert_eq!(cli.config, PathBuf::from("custom.toml"));
    let Commands::Search(args) = cli.command else {
        panic!("expected search");
    };
    assert_eq!(
        args.budget(ResearchBudget::default()),
        ResearchBudget {
            max_keywords: 4,
            max_depth: 3,
            max_concurrency: 5,
            max_articles: 8,
            min_relevance: 6,
        }
    );
    assert_eq!(args.model.as_deref(), Some("cloud"));
    assert_eq!(args.engine, Some(SearchEngine::Google));
    assert!(args.json);
}

#[rstest]
#[case("duckduckgo", SearchEngine::DuckDuckGo)]
#[case("ddg", SearchEngine::DuckDuckGo)]
#[case("Google", SearchEngine::Google)]
fn test_engine_names(#[case] name: &str, #[case] expected: SearchEngine) {
    let Commands::Search(args) = parse(&["search", "q", "-e", name]).command else {
        panic!("expected search");
    };
    assert_eq!(args.engine, Some(expected));
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["search", "q", "--verbose", "--no-color", "--log-json"]);
    assert!(cli.verbose);
    assert!(cli.no_color);
    assert!(cli.log_json);
}

#[test]
fn test_rejects_out_of_range_relevance() {
    let result = Cli::try_parse_from(["deepsearch", "search", "q", "--min-relevance", "11"]);
    assert!(result.is_err());
}

#[test]
fn test_rejects_unknown_engine() {
    let result = Cli::try_parse_from(["deepsearch", "search", "q", "--engine", "altavista"]);
    assert!(result.is_err());
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["deepsearch"]).is_err());
}

#[test]
fn test_other_subcommands() {
    assert!(matches!(parse(&["serve"]).command, Commands::Serve));
    assert!(matches!(parse(&["models"]).command, Commands::Models));

    let Commands::Config { full, validate } = parse(&["config", "--validate"]).command else {
        panic!("expected config");
    };
    assert!(!full);
    assert!(validate);

    let Commands::Init {
        path,
        force,
        provider,
    } = parse(&["init", "project", "--force", "--provider", "both"]).command
    else {
        panic!("expected init");
    };
    assert_eq!(path, PathBuf::from("project"));
    assert!(force);
    assert_eq!(provider, "both");
}
