//! Generative model boundary.
//!
//! The language model is a collaborator with one contract:
//! `generate(prompt, max_tokens) -> text`. The shipped implementation
//! talks to an Ollama-compatible endpoint.

mod client;
mod config;

pub use client::{LlmError, OllamaClient};
pub use config::LlmConfig;

use async_trait::async_trait;

/// A text generator behind an in-process function contract.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}
