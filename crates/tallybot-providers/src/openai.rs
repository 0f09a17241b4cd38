//! Generic HTTP-based LLM provider for OpenAI-compatible APIs.
//!
//! Talks to any `/chat/completions` endpoint (OpenAI, vLLM, Ollama, gateways).
//! Tool arguments travel as JSON strings on this wire format and are decoded
//! into argument maps on the way in.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use tallybot_core::config::{ProviderConfig, RetryConfig};
use tallybot_core::types::{
    LlmResponse, Message, MessageContent, Role, ToolCallRequest, ToolSchema, UsageInfo,
};

use crate::error::ProviderError;
use crate::retry::with_retry;
use crate::traits::{GenerationConfig, LlmProvider};

/// Standard OpenAI API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────
// OpenAiProvider
// ─────────────────────────────────────────────

/// A provider that talks to any OpenAI-compatible HTTP API.
pub struct OpenAiProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    /// Default model for this provider instance.
    default_model: String,
    /// Backoff policy for transient failures.
    retry: RetryConfig,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider from its config.
    ///
    /// A custom `api_base` without a key is accepted (local servers often
    /// need none); the public endpoint requires a key.
    pub fn new(
        config: &ProviderConfig,
        model: &str,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if !config.is_configured() && config.api_base.is_none() {
            return Err(ProviderError::ApiKeyMissing("OpenAI".to_string()));
        }

        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(OpenAiProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            default_model: model.to_string(),
            retry,
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    async fn send_once(
        &self,
        url: &str,
        body: &ChatCompletionRequest,
    ) -> Result<LlmResponse, ProviderError> {
        let mut request = self.client.post(url).json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "HTTP request failed");
            ProviderError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(provider = "OpenAI", status = %status, body = %error_text, "API error");
            return Err(ProviderError::from_http_status(status.as_u16(), &error_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "Failed to parse LLM response");
            ProviderError::ParseError(e.to_string())
        })?;

        parsed.try_into()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(
        &self,
        system_instruction: &str,
        contents: &[Message],
        tools: &[ToolSchema],
        model: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, ProviderError> {
        debug!(
            provider = "OpenAI",
            model = %model,
            messages = contents.len(),
            tools = tools.len(),
            "Calling LLM"
        );

        let body = build_request(system_instruction, contents, tools, model, config);
        let url = self.completions_url();

        let response = with_retry(&self.retry, "openai.chat_completions", || {
            self.send_once(&url, &body)
        })
        .await?;

        debug!(
            provider = "OpenAI",
            has_text = response.text.is_some(),
            tool_calls = response.tool_calls.len(),
            finish_reason = response.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );
        Ok(response)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    /// Every assistant `tool_calls` message must be followed by a `tool`
    /// message per call id, or the API answers 400.
    fn requires_full_history(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────
// Request building
// ─────────────────────────────────────────────

fn build_request(
    system_instruction: &str,
    contents: &[Message],
    tools: &[ToolSchema],
    model: &str,
    config: &GenerationConfig,
) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(contents.len() + 1);
    if !system_instruction.is_empty() {
        messages.push(ChatMessage::System {
            content: system_instruction.to_string(),
        });
    }
    for message in contents {
        append_chat_messages(&mut messages, message);
    }

    let tools = (!tools.is_empty()).then(|| {
        tools
            .iter()
            .map(|t| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.json_schema(),
                },
            })
            .collect::<Vec<_>>()
    });

    ChatCompletionRequest {
        model: model.to_string(),
        messages,
        tool_choice: tools.as_ref().map(|_| "auto".to_string()),
        tools,
        max_tokens: Some(config.max_tokens),
        temperature: Some(config.temperature),
    }
}

/// One conversation turn becomes one chat message, except tool results,
/// which become one `tool` message per result.
fn append_chat_messages(out: &mut Vec<ChatMessage>, message: &Message) {
    match (&message.role, &message.content) {
        (Role::Model, MessageContent::Text(text)) => out.push(ChatMessage::Assistant {
            content: Some(text.clone()),
            tool_calls: None,
        }),
        (Role::Model, MessageContent::ToolCalls(calls)) => out.push(ChatMessage::Assistant {
            content: None,
            tool_calls: Some(
                calls
                    .iter()
                    .map(|c| WireToolCall {
                        id: c.id.clone(),
                        call_type: "function".to_string(),
                        function: WireFunctionCall {
                            name: c.name.clone(),
                            arguments: Value::Object(c.arguments.clone()).to_string(),
                        },
                    })
                    .collect(),
            ),
        }),
        (_, MessageContent::ToolResults(results)) => {
            out.extend(results.iter().map(|r| ChatMessage::Tool {
                content: r.response.to_string(),
                tool_call_id: r.call_id.clone(),
            }))
        }
        (_, MessageContent::Text(text)) => out.push(ChatMessage::User {
            content: text.clone(),
        }),
        // Tool calls only ever come from the model.
        (_, MessageContent::ToolCalls(_)) => {}
    }
}

// ─────────────────────────────────────────────
// Response parsing
// ─────────────────────────────────────────────

impl TryFrom<ChatCompletionResponse> for LlmResponse {
    type Error = ProviderError;

    fn try_from(resp: ChatCompletionResponse) -> Result<Self, Self::Error> {
        let Some(choice) = resp.choices.into_iter().next() else {
            return Err(ProviderError::ParseError("No choices in response".to_string()));
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let arguments = parse_arguments(&tc.function.name, &tc.function.arguments)?;
                Ok(ToolCallRequest::new(tc.id, tc.function.name, arguments))
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        Ok(LlmResponse {
            text: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason,
            usage: resp.usage,
        })
    }
}

/// Decode a JSON-string argument blob. Empty strings mean "no arguments".
fn parse_arguments(name: &str, raw: &str) -> Result<Map<String, Value>, ProviderError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ProviderError::ParseError(format!(
            "arguments for tool '{name}' are not an object: {other}"
        ))),
        Err(e) => Err(ProviderError::ParseError(format!(
            "arguments for tool '{name}' are not valid JSON: {e}"
        ))),
    }
}

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "role")]
enum ChatMessage {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    #[serde(rename = "assistant")]
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<WireToolCall>>,
    },

    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments string.
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    #[serde(rename = "type")]
    tool_type: String,
    function: FunctionDefinition,
}

#[derive(Debug, Serialize)]
struct FunctionDefinition {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
