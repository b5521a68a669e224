use async_trait::async_trait;

use crate::errors::EuporieResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

/// Unified LLM provider trait. The orchestrator only ever sees this trait,
/// so tests can stand in a scripted implementation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches the config.toml key).
    fn name(&self) -> &str;

    /// Sends one chat completion request and returns the assistant text.
    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> EuporieResult<LlmResponse>;
}
