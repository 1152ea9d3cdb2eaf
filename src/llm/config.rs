//! LLM client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the generative model endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether answer generation is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// API endpoint (Ollama-compatible).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Default maximum tokens in a response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum characters of context to send with a prompt.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_prompt_chars() -> usize {
    12000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl LlmConfig {
    /// Base default without env overrides (used internally to avoid
    /// recursion).
    fn base_default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENABLED`: "true" or "false"
    /// - `LLM_ENDPOINT`: endpoint URL
    /// - `LLM_MODEL`: model name
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(enabled) = std::env::var("LLM_ENABLED") {
            self.enabled = enabled.eq_ignore_ascii_case("true") || enabled == "1";
        }
        if let Ok(endpoint) = std::env::var("LLM_ENDPOINT") {
            if !endpoint.is_empty() {
                self.endpoint = endpoint;
            }
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            if !model.is_empty() {
                self.model = model;
            }
        }
        self
    }
}
