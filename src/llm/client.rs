//! Ollama-compatible LLM client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::config::LlmConfig;
use super::GenerativeModel;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to connect to the LLM service.
    #[error("connection error: {0}")]
    Connection(String),

    /// API returned an error.
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Generation is disabled by configuration.
    #[error("LLM is disabled")]
    Disabled,
}

/// Client for an Ollama-compatible generation endpoint.
pub struct OllamaClient {
    config: LlmConfig,
    client: Client,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // slow local models
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the LLM service is reachable.
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let url = format!("{}/api/tags", self.config.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Truncate a prompt to the configured maximum (UTF-8 safe).
    fn truncate_prompt<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.config.max_prompt_chars {
            return text;
        }
        let mut end = self.config.max_prompt_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

#[async_trait::async_trait]
impl GenerativeModel for OllamaClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: self.truncate_prompt(prompt).to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: max_tokens,
            },
        };

        debug!("Generating with {} ({} prompt chars)", request.model, request.prompt.len());
        let url = format!("{}/api/generate", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(ollama_resp.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_prompt_char_boundary() {
        let mut config = LlmConfig::default();
        config.max_prompt_chars = 5;
        let client = OllamaClient::new(config).unwrap();

        // "héllo world" - byte 5 falls inside a multibyte char boundary case
        let truncated = client.truncate_prompt("héllo world");
        assert!(truncated.len() <= 5);
        assert!("héllo world".starts_with(truncated));

        let short = client.truncate_prompt("ok");
        assert_eq!(short, "ok");
    }

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert!(config.endpoint.starts_with("http"));
        assert!(!config.model.is_empty());
        assert_eq!(config.max_tokens, 512);
    }
}
