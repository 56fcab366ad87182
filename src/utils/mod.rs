/// TOML configuration (`deepsearch.toml`) and its validation.
pub mod toml_config;
