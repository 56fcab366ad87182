use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Client for a local or remote Ollama server
pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    /// `base_url` is a full URL such as `http://localhost:11434`; the port
    /// defaults to 11434 when omitted.
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        let (host, port) = split_base_url(base_url)?;
        Ok(Self {
            client: Ollama::new(host, port),
            model,
        })
    }
}

fn split_base_url(base_url: &str) -> Result<(String, u16)> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| AppError::Config(format!("Invalid Ollama base_url '{}': {}", base_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Config(format!("Ollama base_url '{}' has no host", base_url)))?;
    let port = url.port().unwrap_or(DEFAULT_OLLAMA_PORT);
    Ok((format!("{}://{}", url.scheme(), host), port))
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ];

        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error ({}): {}", self.model, e)))?;

        if response.message.content.trim().is_empty() {
            return Err(AppError::LLM(format!("Empty response from {}", self.model)));
        }
        Ok(response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
