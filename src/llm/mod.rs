//! LLM Provider Clients
//!
//! The research engine talks to models through the [`LLMClient`] trait.
//! Concrete clients are selected with a [`Provider`] and assembled into the
//! oracle rotation by the [`ModelRegistry`].
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints
//! - `ollama` - Local Ollama server

/// Core LLM client trait and provider selection.
pub mod client;
/// Model registry building the oracle rotation from configuration.
pub mod provider_registry;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
pub use provider_registry::{ModelRegistry, RotationSlot};
