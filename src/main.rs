use anyhow::Context;
use clap::Parser;
use deepsearch::{
    AppState, DeepsearchConfig, ProgressEvent,
    api::create_app,
    cache::ResponseCache,
    cli::{
        Cli, Commands, SearchArgs,
        init::{self, InitConfig, InitResult},
        output::Output,
    },
    db::LibsqlStore,
    utils::toml_config::ProviderConfig,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let Cli {
        config: config_path,
        verbose,
        no_color,
        log_json,
        command,
    } = Cli::parse();

    let output = if no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match command {
        Commands::Init {
            path,
            force,
            provider,
        } => {
            init_logging("warn", verbose, log_json);
            match init::run(
                InitConfig {
                    path,
                    force,
                    provider,
                },
                &output,
            ) {
                InitResult::Success | InitResult::AlreadyExists => Ok(ExitCode::SUCCESS),
                InitResult::Error(_) => Ok(ExitCode::FAILURE),
            }
        }
        Commands::Config { full, validate } => {
            init_logging("warn", verbose, log_json);
            show_config(&config_path, full, validate, &output)
        }
        Commands::Models => {
            let config = load_config(&config_path)?;
            init_logging(&config.server.log_level, verbose, log_json);
            show_models(&config, &output);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Search(args) => {
            let config = load_config(&config_path)?;
            init_logging(&config.server.log_level, verbose, log_json);

            let cache = open_cache(&config).await?;
            let state = AppState::from_config(config, Arc::clone(&cache), args.engine)?;
            let outcome = run_search(&state, args, &output).await;
            cache.close().await;
            outcome
        }
        Commands::Serve => {
            let config = load_config(&config_path)?;
            init_logging(&config.server.log_level, verbose, log_json);

            let cache = open_cache(&config).await?;
            let state = AppState::from_config(config, Arc::clone(&cache), None)?;
            let outcome = serve(state, &output).await;
            cache.close().await;
            outcome.map(|_| ExitCode::SUCCESS)
        }
    }
}

/// `RUST_LOG` wins; otherwise `level`, or `debug` with `--verbose`.
/// Logs go to stderr so `search --json` output stays machine-readable.
fn init_logging(level: &str, verbose: bool, json: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new(format!("{},deepsearch={}", level, level)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<DeepsearchConfig> {
    DeepsearchConfig::load(path).with_context(|| {
        format!(
            "Failed to load {} (run 'deepsearch init' to create one)",
            path.display()
        )
    })
}

async fn open_cache(config: &DeepsearchConfig) -> anyhow::Result<Arc<ResponseCache>> {
    if !config.cache.enabled {
        info!("Durable cache disabled, using memory only");
        return Ok(Arc::new(ResponseCache::in_memory()));
    }

    let store = LibsqlStore::new_local(&config.cache.path).await?;
    info!(path = %config.cache.path, "Cache database opened");
    Ok(Arc::new(ResponseCache::open(Arc::new(store))))
}

async fn run_search(
    state: &AppState,
    args: SearchArgs,
    output: &Output,
) -> anyhow::Result<ExitCode> {
    if let Some(model) = args.model.as_deref() {
        state.gateway.select_model(model)?;
    }

    let budget = args.budget(state.config.research.budget());
    let mut progress = state.orchestrator.run(&args.query, budget)?;
    let mut code = ExitCode::FAILURE;

    loop {
        let event = tokio::select! {
            event = progress.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                output.warning("Interrupted, abandoning research run");
                progress.cancel();
                break;
            }
        };
        let Some(event) = event else { break };

        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            output.event(&event);
        }
        if matches!(event, ProgressEvent::Done { .. }) {
            code = ExitCode::SUCCESS;
        }
    }

    let stats = state.gateway.cache().stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        dispatches = state.gateway.dispatch_count(),
        "Research finished"
    );

    Ok(code)
}

async fn serve(state: AppState, output: &Output) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.banner();
    output.success(&format!("Listening on http://{}", addr));
    output.kv("Research", "POST /api/research (text/event-stream)");
    output.kv("OpenAPI", "GET /api/openapi.json");
    info!(%addr, models = ?state.gateway.rotation(), "Server started");

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

fn show_config(
    path: &Path,
    full: bool,
    validate: bool,
    output: &Output,
) -> anyhow::Result<ExitCode> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = DeepsearchConfig::from_toml(&content)?;

    output.header(&format!("Configuration: {}", path.display()));
    output.kv(
        "Server",
        &format!("{}:{}", config.server.host, config.server.port),
    );
    output.kv(
        "Cache",
        &if config.cache.enabled {
            config.cache.path.clone()
        } else {
            "memory only".to_string()
        },
    );
    output.kv("Rotation", &config.oracle.rotation.join(" -> "));
    output.kv("Search engine", config.search.engine.as_str());

    let budget = config.research.budget();
    output.kv(
        "Research",
        &format!(
            "keywords={} depth={} concurrency={} articles={} min_relevance={}",
            budget.max_keywords,
            budget.max_depth,
            budget.max_concurrency,
            budget.max_articles,
            budget.min_relevance
        ),
    );

    if full {
        output.header("Providers");
        let mut providers: Vec<_> = config.providers.iter().collect();
        providers.sort_by_key(|(name, _)| name.as_str());
        for (name, provider) in providers {
            let detail = match provider {
                ProviderConfig::Ollama { base_url } => format!("ollama @ {}", base_url),
                ProviderConfig::OpenAI {
                    api_key_env,
                    api_base,
                } => format!("openai @ {} (key from ${})", api_base, api_key_env),
            };
            output.kv(name, &detail);
        }

        output.header("Models");
        let mut models: Vec<_> = config.models.iter().collect();
        models.sort_by_key(|(name, _)| name.as_str());
        for (name, model) in models {
            output.kv(name, &format!("{} via {}", model.model, model.provider));
        }

        output.header("Oracle retry");
        output.kv(
            "Attempts per model",
            &config.oracle.attempts_per_model.to_string(),
        );
        output.kv(
            "Pauses",
            &format!(
                "{}ms retry, {}ms rotation",
                config.oracle.retry_pause_ms, config.oracle.rotation_pause_ms
            ),
        );
        output.kv(
            "Max rotations",
            &match config.oracle.max_rotations {
                0 => "unbounded".to_string(),
                n => n.to_string(),
            },
        );
    }

    if validate {
        match config.validate() {
            Ok(()) => output.success("Configuration is valid"),
            Err(e) => {
                output.error(&e.to_string());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    output.newline();
    Ok(ExitCode::SUCCESS)
}

fn show_models(config: &DeepsearchConfig, output: &Output) {
    output.header("Oracle rotation");
    output.table_header(&["Name", "Provider", "Model"]);
    for name in &config.oracle.rotation {
        let (provider, model) = config
            .models
            .get(name)
            .map(|m| (m.provider.as_str(), m.model.as_str()))
            .unwrap_or(("?", "?"));
        output.table_row(&[name.as_str(), provider, model]);
    }
    output.newline();
}
