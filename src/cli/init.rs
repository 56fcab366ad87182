//! Init command implementation
//!
//! Scaffolds `deepsearch.toml`, `.env.example` and a `.gitignore` for the
//! cache database.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// deepsearch.toml is already present
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama, openai, or both)
    pub provider: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing deepsearch");

    let base_path = &config.path;
    if let Err(e) = fs::create_dir_all(base_path) {
        output.error(&format!("Failed to create {}: {}", base_path.display(), e));
        return InitResult::Error(e.to_string());
    }

    let config_path = base_path.join("deepsearch.toml");
    if config_path.exists() && !config.force {
        output.warning("deepsearch.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let toml_content = generate_config_toml(&config.provider);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create deepsearch.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "deepsearch.toml");

    let env_example_path = base_path.join(".env.example");
    if env_example_path.exists() && !config.force {
        output.skipped(".env.example", "already exists");
    } else if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("env", ".env.example");
    }

    let gitignore_path = base_path.join(".gitignore");
    if gitignore_path.exists() {
        output.skipped(".gitignore", "already exists");
    } else if let Err(e) = write_file(&gitignore_path, &generate_gitignore(), false) {
        output.warning(&format!("Failed to create .gitignore: {}", e));
    } else {
        output.created("file", ".gitignore");
    }

    output.complete("deepsearch initialized");

    output.header("Next Steps");
    if config.provider != "ollama" {
        output.info("Set your API keys:");
        output.command("cp .env.example .env");
    }
    if config.provider != "openai" {
        output.info("Start Ollama and pull the default model:");
        output.command("ollama serve");
        output.command("ollama pull qwen2.5:7b");
    }
    output.info("Run a search:");
    output.command("deepsearch search \"benefits of static typing\"");
    output.hint("Use 'deepsearch serve' to expose the research API over HTTP");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_config_toml(provider: &str) -> String {
    let ollama = r#"[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"

[models.local]
provider = "ollama-local"
model = "qwen2.5:7b"
"#;
    let openai = r#"[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"

[models.cloud]
provider = "openai"
model = "gpt-4o-mini"
"#;

    let (providers, rotation) = match provider {
        "openai" => (openai.to_string(), r#"["cloud"]"#),
        "both" => (format!("{}\n{}", ollama, openai), r#"["local", "cloud"]"#),
        _ => (ollama.to_string(), r#"["local"]"#),
    };

    format!(
        r#"# deepsearch configuration

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"

[cache]
path = "./data/deepsearch.db"
enabled = true

# ============= Providers & Models =============

{providers}
# ============= Oracle =============
# Models are tried in rotation order; each gets attempts_per_model tries
# before the next one takes over. max_rotations = 0 retries forever.

[oracle]
rotation = {rotation}
attempts_per_model = 2
retry_pause_ms = 30000
rotation_pause_ms = 5000
max_rotations = 3

# ============= Search =============

[search]
engine = "duckduckgo"
max_results = 3
# For engine = "google", set these variables in .env
google_api_key_env = "GOOGLE_SEARCH_API_KEY"
google_engine_id_env = "GOOGLE_SEARCH_ENGINE_ID"

# ============= Research defaults =============

[research]
keywords = 3
max_depth = 2
max_concurrency = 2
max_articles = 5
min_relevance = 7
max_page_chars = 12000
translation_language = "English"
"#
    )
}

fn generate_env_example() -> String {
    r#"# deepsearch environment variables
# Copy this file to .env and fill in the values.

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=info,deepsearch=debug

# OpenAI-compatible providers
# OPENAI_API_KEY=sk-...

# Google Custom Search ([search] engine = "google")
# GOOGLE_SEARCH_API_KEY=...
# GOOGLE_SEARCH_ENGINE_ID=...
"#
    .to_string()
}

fn generate_gitignore() -> String {
    r#"# deepsearch cache
/data/
*.db
*.db-journal

# Environment
.env
.env.local
"#
    .to_string()
}
