//! ============================================================================
//! LLM Module - Embedding and chat-completion clients
//! ============================================================================
//! Both services sit behind async traits so the pipeline can run against
//! the OpenAI-compatible HTTP client in production and fakes in tests.
//!
//! Calls are awaited one at a time; no retries. Errors propagate to the
//! caller as `QaError::Transport` / `QaError::Service`.
//! ============================================================================

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChatMessage;

/// Converts text into a fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Generates the next assistant message for a conversation
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<String>;
}

/// Parameters of a single completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub messages: &'a [ChatMessage],
    pub max_tokens: Option<u32>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(model: &'a str, temperature: f32, messages: &'a [ChatMessage]) -> Self {
        Self {
            model,
            temperature,
            messages,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
