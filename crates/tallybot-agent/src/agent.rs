//! Agent — conversation state plus exactly one model call per turn.
//!
//! The agent owns the history and the tool registry. It never executes
//! tools itself; that is the run loop's job.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use tallybot_core::config::{Config, HistoryPolicy, DEFAULT_SYSTEM_PROMPT};
use tallybot_core::types::{Message, ToolCallRequest, TurnInput};
use tallybot_core::CoreError;
use tallybot_providers::{GenerationConfig, LlmProvider, ProviderError};

use crate::tools::ToolRegistry;

/// Errors that abort a turn.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid turn input: {0}")]
    Input(#[from] CoreError),

    /// The model replied with neither tool calls nor text.
    #[error(
        "model returned an empty response (finish reason: {})",
        .finish_reason.as_deref().unwrap_or("unknown")
    )]
    EmptyResponse { finish_reason: Option<String> },
}

/// What the model decided on one turn.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    /// The model wants these tools run, in order.
    ToolCalls(Vec<ToolCallRequest>),
    /// The model's final answer.
    Text(String),
}

/// Per-agent model settings.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSettings {
    /// Model identifier. Empty means the provider's default.
    pub model: String,
    pub system_prompt: String,
    pub generation: GenerationConfig,
    pub history: HistoryPolicy,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            generation: GenerationConfig::default(),
            history: HistoryPolicy::default(),
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.agent.model.clone(),
            system_prompt: config.agent.system_prompt.clone(),
            generation: GenerationConfig {
                max_tokens: config.agent.max_tokens,
                temperature: config.agent.temperature,
            },
            history: config.agent.history,
        }
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    settings: AgentSettings,
    tools: ToolRegistry,
    /// Append-only conversation history, oldest first.
    history: Vec<Message>,
}

impl Agent {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry, mut settings: AgentSettings) -> Self {
        if settings.model.is_empty() {
            settings.model = provider.default_model().to_string();
        }
        if provider.requires_full_history() && settings.history != HistoryPolicy::Full {
            debug!(
                provider = provider.display_name(),
                "provider needs full history, storing input turns too"
            );
            settings.history = HistoryPolicy::Full;
        }
        Self {
            provider,
            settings,
            tools,
            history: Vec::new(),
        }
    }

    /// Send one input to the model and record its reply.
    ///
    /// Makes exactly one backend call. Under [`HistoryPolicy::ModelTurnsOnly`]
    /// the history grows by one turn per successful call; under
    /// [`HistoryPolicy::Full`] the input turn is kept too.
    pub async fn process_turn(&mut self, input: TurnInput) -> Result<TurnOutcome, AgentError> {
        let input_turn = input.to_message()?;
        let mut contents = Vec::with_capacity(self.history.len() + 1);
        contents.extend_from_slice(&self.history);
        contents.push(input_turn);

        let schemas = self.tools.schemas();
        debug!(
            provider = self.provider.display_name(),
            model = %self.settings.model,
            turns = contents.len(),
            tools = schemas.len(),
            "LLM call"
        );

        let response = self
            .provider
            .chat(
                &self.settings.system_prompt,
                &contents,
                &schemas,
                &self.settings.model,
                &self.settings.generation,
            )
            .await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "token usage"
            );
        }

        let (reply, outcome) = if response.has_tool_calls() {
            let calls = response.tool_calls;
            (Message::model_tool_calls(calls.clone()), TurnOutcome::ToolCalls(calls))
        } else if let Some(text) = response.final_text() {
            (Message::model_text(text), TurnOutcome::Text(text.to_string()))
        } else {
            return Err(AgentError::EmptyResponse {
                finish_reason: response.finish_reason.clone(),
            });
        };

        if self.settings.history == HistoryPolicy::Full {
            if let Some(input_turn) = contents.pop() {
                self.history.push(input_turn);
            }
        }
        self.history.push(reply);
        Ok(outcome)
    }

    /// Stored conversation turns, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider.display_name())
            .field("settings", &self.settings)
            .field("tools", &self.tools)
            .field("history_len", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{calc_call, ScriptedProvider};
    use crate::tools::default_registry;
    use serde_json::json;
    use tallybot_core::types::{LlmResponse, MessageContent, Role, ToolCallResult};

    fn agent_with(provider: Arc<ScriptedProvider>, history: HistoryPolicy) -> Agent {
        let settings = AgentSettings {
            history,
            ..AgentSettings::default()
        };
        Agent::new(provider, default_registry(), settings)
    }

    #[tokio::test]
    async fn test_text_reply_appends_one_model_turn() {
        let provider = Arc::new(ScriptedProvider::replies(vec![LlmResponse::text("Hello!")]));
        let mut agent = agent_with(provider.clone(), HistoryPolicy::ModelTurnsOnly);

        let outcome = agent.process_turn("hi".into()).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Text("Hello!".into()));
        assert_eq!(agent.history(), &[Message::model_text("Hello!")]);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_prompt_tools_and_settings() {
        let provider = Arc::new(ScriptedProvider::replies(vec![LlmResponse::text("ok")]));
        let mut agent = agent_with(provider.clone(), HistoryPolicy::ModelTurnsOnly);
        agent.process_turn("hi".into()).await.unwrap();

        let calls = provider.calls();
        let call = &calls[0];
        assert_eq!(call.system_instruction, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(call.model, "scripted-model");
        assert_eq!(call.config, GenerationConfig::default());
        assert_eq!(call.tools.len(), 1);
        assert_eq!(call.tools[0].name, "calculator");
        assert_eq!(call.contents, vec![Message::user("hi")]);
    }

    #[tokio::test]
    async fn test_tool_calls_take_precedence_over_text() {
        let mut response = LlmResponse::tool_calls(vec![calc_call("c1", "1+1")]);
        response.text = Some("let me compute".into());
        let provider = Arc::new(ScriptedProvider::replies(vec![response]));
        let mut agent = agent_with(provider, HistoryPolicy::ModelTurnsOnly);

        let outcome = agent.process_turn("add".into()).await.unwrap();
        assert_eq!(outcome, TurnOutcome::ToolCalls(vec![calc_call("c1", "1+1")]));
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history()[0].role, Role::Model);
        assert!(matches!(agent.history()[0].content, MessageContent::ToolCalls(ref c) if c.len() == 1));
    }

    #[tokio::test]
    async fn test_history_grows_by_one_per_turn() {
        let provider = Arc::new(ScriptedProvider::replies(vec![
            LlmResponse::tool_calls(vec![calc_call("c1", "2*3")]),
            LlmResponse::text("6"),
        ]));
        let mut agent = agent_with(provider.clone(), HistoryPolicy::ModelTurnsOnly);

        agent.process_turn("2 times 3?".into()).await.unwrap();
        assert_eq!(agent.history().len(), 1);

        let result = ToolCallResult::new("c1", "calculator", &json!({"result": 6}));
        agent
            .process_turn(TurnInput::ToolResults(vec![result]))
            .await
            .unwrap();
        assert_eq!(agent.history().len(), 2);

        // The second request is the stored model turn plus the transient tool turn.
        let calls = provider.calls();
        let second = &calls[1].contents;
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].role, Role::Model);
        assert_eq!(second[1].role, Role::Tool);
        match &second[1].content {
            MessageContent::ToolResults(parts) => {
                assert_eq!(parts[0].call_id, "c1");
                assert_eq!(parts[0].name, "calculator");
                assert_eq!(parts[0].response, json!({"result": 6}));
            }
            other => panic!("expected tool results, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_policy_keeps_input_turns() {
        let provider = Arc::new(ScriptedProvider::replies(vec![
            LlmResponse::text("first"),
            LlmResponse::text("second"),
        ]));
        let mut agent = agent_with(provider.clone(), HistoryPolicy::Full);

        agent.process_turn("one".into()).await.unwrap();
        agent.process_turn("two".into()).await.unwrap();

        assert_eq!(
            agent.history(),
            &[
                Message::user("one"),
                Message::model_text("first"),
                Message::user("two"),
                Message::model_text("second"),
            ]
        );
        assert_eq!(provider.calls()[1].contents.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_response_is_fatal() {
        let mut response = LlmResponse::text("   ");
        response.finish_reason = Some("MAX_TOKENS".into());
        let provider = Arc::new(ScriptedProvider::replies(vec![response]));
        let mut agent = agent_with(provider, HistoryPolicy::ModelTurnsOnly);

        let err = agent.process_turn("hi".into()).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::EmptyResponse { finish_reason: Some(ref r) } if r == "MAX_TOKENS"
        ));
        assert!(err.to_string().contains("MAX_TOKENS"));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_leaves_history_untouched() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let mut agent = agent_with(provider, HistoryPolicy::Full);

        let err = agent.process_turn("hi".into()).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(ProviderError::AuthenticationFailed(_))));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_tool_results_rejected_without_call() {
        let provider = Arc::new(ScriptedProvider::replies(vec![LlmResponse::text("x")]));
        let mut agent = agent_with(provider.clone(), HistoryPolicy::ModelTurnsOnly);

        let err = agent
            .process_turn(TurnInput::ToolResults(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Input(CoreError::EmptyToolResults)));
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_explicit_model_kept() {
        let provider = Arc::new(ScriptedProvider::replies(Vec::new()));
        let settings = AgentSettings {
            model: "gemini-2.5-pro".into(),
            ..AgentSettings::default()
        };
        let agent = Agent::new(provider, ToolRegistry::new(), settings);
        assert_eq!(agent.model(), "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_full_history_backend_overrides_policy() {
        let provider = Arc::new(
            ScriptedProvider::replies(vec![
                LlmResponse::tool_calls(vec![calc_call("c1", "2*3")]),
                LlmResponse::text("6"),
            ])
            .needing_full_history(),
        );
        let mut agent = agent_with(provider.clone(), HistoryPolicy::ModelTurnsOnly);
        assert_eq!(agent.settings().history, HistoryPolicy::Full);

        agent.process_turn("2 times 3?".into()).await.unwrap();
        let result = ToolCallResult::new("c1", "calculator", &json!({"result": 6}));
        agent
            .process_turn(TurnInput::ToolResults(vec![result]))
            .await
            .unwrap();

        let roles: Vec<Role> = provider.calls()[1].contents.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::Tool]);
        assert_eq!(agent.history().len(), 4);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.agent.max_tokens = 256;
        config.agent.temperature = 0.7;
        config.agent.history = HistoryPolicy::Full;
        let settings = AgentSettings::from_config(&config);
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.generation.max_tokens, 256);
        assert_eq!(settings.generation.temperature, 0.7);
        assert_eq!(settings.history, HistoryPolicy::Full);
    }
}
