//! Google Gemini provider — talks to the REST `generateContent` endpoint.
//!
//! Tool schemas go out as `functionDeclarations`; model tool requests come
//! back as `functionCall` parts and results are returned as
//! `functionResponse` parts.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use tallybot_core::config::{ProviderConfig, RetryConfig};
use tallybot_core::types::{
    LlmResponse, Message, MessageContent, Role, ToolCallRequest, ToolSchema, UsageInfo,
};

use crate::error::ProviderError;
use crate::retry::with_retry;
use crate::traits::{GenerationConfig, LlmProvider};

/// Public Gemini API base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// ─────────────────────────────────────────────
// GeminiProvider
// ─────────────────────────────────────────────

pub struct GeminiProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL, without trailing slash.
    api_base: String,
    /// API key, sent in the `x-goog-api-key` header.
    api_key: String,
    /// Default model for this provider instance.
    default_model: String,
    /// Backoff policy for transient failures.
    retry: RetryConfig,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider from its config.
    ///
    /// Fails if no API key is configured or the HTTP client can't be built.
    pub fn new(
        config: &ProviderConfig,
        model: &str,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::ApiKeyMissing("Gemini".to_string()));
        }

        let api_base = config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(GeminiProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            default_model: model.to_string(),
            retry,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    async fn send_once(&self, url: &str, body: &GeminiRequest) -> Result<LlmResponse, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "HTTP request failed");
                ProviderError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(provider = "Gemini", status = %status, body = %body, "API error");
            return Err(ProviderError::from_http_status(
                status.as_u16(),
                &error_message(&body),
            ));
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "Failed to parse LLM response");
            ProviderError::ParseError(e.to_string())
        })?;

        Ok(parsed.into())
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(
        &self,
        system_instruction: &str,
        contents: &[Message],
        tools: &[ToolSchema],
        model: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, ProviderError> {
        debug!(
            provider = "Gemini",
            model = %model,
            contents = contents.len(),
            tools = tools.len(),
            "Calling LLM"
        );

        let body = build_request(system_instruction, contents, tools, config);
        let url = self.generate_url(model);

        let response = with_retry(&self.retry, "gemini.generateContent", || {
            self.send_once(&url, &body)
        })
        .await?;

        debug!(
            provider = "Gemini",
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
        "Gemini"
    }
}

// ─────────────────────────────────────────────
// Request building
// ─────────────────────────────────────────────

fn build_request(
    system_instruction: &str,
    contents: &[Message],
    tools: &[ToolSchema],
    config: &GenerationConfig,
) -> GeminiRequest {
    let tools = if tools.is_empty() {
        None
    } else {
        Some(vec![GeminiTool {
            function_declarations: tools
                .iter()
                .map(|t| GeminiFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.json_schema(),
                })
                .collect(),
        }])
    };

    let system_instruction = (!system_instruction.is_empty()).then(|| GeminiSystemInstruction {
        parts: vec![GeminiPart::Text {
            text: system_instruction.to_string(),
        }],
    });

    GeminiRequest {
        contents: contents.iter().map(to_gemini_content).collect(),
        tools,
        system_instruction,
        generation_config: GeminiGenerationConfig {
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
        },
    }
}

fn to_gemini_content(message: &Message) -> GeminiContent {
    // Function responses travel in a user-role content block.
    let role = match message.role {
        Role::User | Role::Tool => "user",
        Role::Model => "model",
    };

    let parts = match &message.content {
        MessageContent::Text(text) => vec![GeminiPart::Text { text: text.clone() }],
        MessageContent::ToolCalls(calls) => calls
            .iter()
            .map(|c| GeminiPart::FunctionCall {
                function_call: GeminiFunctionCall {
                    name: c.name.clone(),
                    args: Value::Object(c.arguments.clone()),
                },
                thought_signature: c.thought_signature.clone(),
            })
            .collect(),
        MessageContent::ToolResults(results) => results
            .iter()
            .map(|r| GeminiPart::FunctionResponse {
                function_response: GeminiFunctionResponse {
                    name: r.name.clone(),
                    response: as_struct(&r.response),
                },
            })
            .collect(),
    };

    GeminiContent {
        role: role.to_string(),
        parts,
    }
}

/// `functionResponse.response` must be a JSON object; wrap anything else.
fn as_struct(value: &Value) -> Value {
    if value.is_object() {
        value.clone()
    } else {
        json!({ "content": value })
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ─────────────────────────────────────────────
// Response parsing
// ─────────────────────────────────────────────

impl From<GeminiResponse> for LlmResponse {
    fn from(resp: GeminiResponse) -> Self {
        let usage = resp.usage_metadata.map(|u| UsageInfo {
            prompt_tokens: u.prompt_token_count.unwrap_or(0),
            completion_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count.unwrap_or(0),
        });

        let Some(candidate) = resp.candidates.into_iter().next() else {
            return LlmResponse {
                usage,
                ..Default::default()
            };
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            match part {
                GeminiPart::Text { text: t } => text.push_str(&t),
                GeminiPart::FunctionCall {
                    function_call,
                    thought_signature,
                } => {
                    let arguments = match function_call.args {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    };
                    let id = format!("call_{}", tool_calls.len());
                    tool_calls.push(
                        ToolCallRequest::new(id, function_call.name, arguments)
                            .with_thought_signature(thought_signature),
                    );
                }
                GeminiPart::FunctionResponse { .. } | GeminiPart::Other(_) => {}
            }
        }

        LlmResponse {
            text: (!text.is_empty()).then_some(text),
            tool_calls,
            finish_reason: candidate.finish_reason,
            usage,
        }
    }
}

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
        /// Must go back with the call on the next request.
        #[serde(
            rename = "thoughtSignature",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        thought_signature: Option<String>,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    /// Part kinds we don't act on (inline data, executable code, ...).
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
