//! Scripted provider shared by the agent and run-loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use tallybot_core::types::{LlmResponse, Message, ToolCallRequest, ToolSchema};
use tallybot_providers::{GenerationConfig, LlmProvider, ProviderError};

/// What the provider saw on one call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system_instruction: String,
    pub contents: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub model: String,
    pub config: GenerationConfig,
}

/// Replays queued responses, then repeats `fallback` forever.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<LlmResponse, ProviderError>>>,
    fallback: Option<LlmResponse>,
    full_history: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<LlmResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            full_history: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(responses: Vec<LlmResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    /// A backend that answers every call with the same response.
    pub fn always(response: LlmResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    /// Claim the backend needs the whole conversation on every call.
    pub fn needing_full_history(mut self) -> Self {
        self.full_history = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(
        &self,
        system_instruction: &str,
        contents: &[Message],
        tools: &[ToolSchema],
        model: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system_instruction: system_instruction.to_string(),
            contents: contents.to_vec(),
            tools: tools.to_vec(),
            model: model.to_string(),
            config: config.clone(),
        });
        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(response), _) => response,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Ok(LlmResponse::text("(script exhausted)")),
        }
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }

    fn requires_full_history(&self) -> bool {
        self.full_history
    }
}

/// A calculator call with the given id and expression.
pub fn calc_call(id: &str, expression: &str) -> ToolCallRequest {
    let mut args = Map::new();
    args.insert("expression".into(), Value::String(expression.into()));
    ToolCallRequest::new(id, "calculator", args)
}
