//! Core types for Tallybot — conversation turns, tool schemas, tool calls.
//!
//! These types are backend-neutral. Each provider translates them into its own
//! wire format (Gemini `contents`/`parts`, OpenAI chat messages) and back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::CoreError;

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    /// Output of locally executed tools, fed back to the model.
    Tool,
}

/// The body of a turn. Exactly one shape per turn.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    ToolCalls(Vec<ToolCallRequest>),
    ToolResults(Vec<ToolResultPart>),
}

/// One turn of conversation history.
///
/// Role and content shape are coupled; use the constructors rather than
/// building the struct by hand.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// A user turn with plain text.
    pub fn user(text: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A model turn carrying a final (or intermediate) text answer.
    pub fn model_text(text: impl Into<String>) -> Self {
        Message {
            role: Role::Model,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A model turn requesting one or more tool calls.
    pub fn model_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Message {
            role: Role::Model,
            content: MessageContent::ToolCalls(calls),
        }
    }

    /// A tool turn carrying parsed tool results.
    pub fn tool_results(parts: Vec<ToolResultPart>) -> Self {
        Message {
            role: Role::Tool,
            content: MessageContent::ToolResults(parts),
        }
    }

    /// Text content, if this is a text turn.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(t) => Some(t),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────
// Tool calls and results
// ─────────────────────────────────────────────

/// A model's request to run a named tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Call identifier. Synthesized for backends that don't issue one.
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    /// Opaque reasoning token some backends attach to a call and expect
    /// back verbatim when the turn is replayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments,
            thought_signature: None,
        }
    }

    pub fn with_thought_signature(mut self, signature: Option<String>) -> Self {
        self.thought_signature = signature;
        self
    }
}

/// The outcome of one tool execution, packaged for the next model call.
///
/// `content` is the payload serialized as a JSON string; [`payload`](Self::payload)
/// parses it back.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub name: String,
    pub content: String,
}

impl ToolCallResult {
    /// Package a structured payload, serializing it to JSON.
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, payload: &Value) -> Self {
        ToolCallResult {
            call_id: call_id.into(),
            name: name.into(),
            content: payload.to_string(),
        }
    }

    /// Parse the serialized payload back into structured data.
    pub fn payload(&self) -> Result<Value, CoreError> {
        serde_json::from_str(&self.content).map_err(|source| CoreError::MalformedToolResult {
            name: self.name.clone(),
            source,
        })
    }
}

/// A parsed tool result as it appears inside a [`Role::Tool`] turn.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolResultPart {
    pub call_id: String,
    pub name: String,
    pub response: Value,
}

// ─────────────────────────────────────────────
// Turn input
// ─────────────────────────────────────────────

/// The next input handed to the agent: fresh user text, or the results of
/// the tool calls the model asked for on the previous turn.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnInput {
    UserText(String),
    ToolResults(Vec<ToolCallResult>),
}

impl TurnInput {
    /// Build the conversation turn representing this input.
    ///
    /// Tool results are parsed back from their JSON strings, in order.
    pub fn to_message(&self) -> Result<Message, CoreError> {
        match self {
            TurnInput::UserText(text) => Ok(Message::user(text.clone())),
            TurnInput::ToolResults(results) => {
                if results.is_empty() {
                    return Err(CoreError::EmptyToolResults);
                }
                let parts = results
                    .iter()
                    .map(|r| {
                        Ok(ToolResultPart {
                            call_id: r.call_id.clone(),
                            name: r.name.clone(),
                            response: r.payload()?,
                        })
                    })
                    .collect::<Result<Vec<_>, CoreError>>()?;
                Ok(Message::tool_results(parts))
            }
        }
    }
}

impl From<&str> for TurnInput {
    fn from(text: &str) -> Self {
        TurnInput::UserText(text.to_string())
    }
}

// ─────────────────────────────────────────────
// Tool schemas
// ─────────────────────────────────────────────

/// JSON type of a tool parameter.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

/// Description of a single tool parameter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(param_type: ParamType, description: impl Into<String>) -> Self {
        ParameterSpec {
            param_type,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(param_type: ParamType, description: impl Into<String>) -> Self {
        ParameterSpec {
            required: false,
            ..Self::required(param_type, description)
        }
    }
}

/// A tool's self-description: the name the model calls it by, what it does,
/// and the parameters it accepts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// Keyed by parameter name; ordered so rendering is deterministic.
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        ToolSchema {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter (builder style).
    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.insert(
            name.into(),
            ParameterSpec {
                param_type,
                description: description.into(),
                required,
            },
        );
        self
    }

    /// Render the parameters as a JSON Schema object.
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    json!({ "type": spec.param_type, "description": spec.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// ─────────────────────────────────────────────
// LLM Response
// ─────────────────────────────────────────────

/// A backend's reply to one generate call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    /// Text content (None if the model only requested tools).
    pub text: Option<String>,
    /// Tool calls requested by the model, in emission order.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Why the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage statistics.
    pub usage: Option<UsageInfo>,
}

impl LlmResponse {
    /// A plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        LlmResponse {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A reply requesting tool calls.
    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        LlmResponse {
            tool_calls: calls,
            ..Default::default()
        }
    }

    /// Whether the response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content, ignoring empty or whitespace-only strings.
    pub fn final_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Token usage statistics from the LLM.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
