//! LLM Provider trait — the single seam between the agent and a backend.

use async_trait::async_trait;
use tallybot_core::types::{LlmResponse, Message, ToolSchema};

use crate::error::ProviderError;

/// Generation parameters passed to each LLM call.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one blocking generate call.
    ///
    /// # Arguments
    /// * `system_instruction` — Fixed system prompt.
    /// * `contents` — Full conversation content, oldest turn first.
    /// * `tools`    — Schemas of every tool the model may call.
    /// * `model`    — Model identifier (e.g. `"gemini-2.5-flash"`, `"gpt-4o-mini"`).
    /// * `config`   — Temperature and max output tokens.
    ///
    /// # Returns
    /// The model's tool calls and/or text. Transport, status, and decoding
    /// failures are returned as [`ProviderError`].
    async fn chat(
        &self,
        system_instruction: &str,
        contents: &[Message],
        tools: &[ToolSchema],
        model: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, ProviderError>;

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;

    /// Whether every request must carry the whole conversation, user turn
    /// and tool replies included. Wire formats that pair each tool call with
    /// its reply reject a history holding model turns only.
    fn requires_full_history(&self) -> bool {
        false
    }
}
