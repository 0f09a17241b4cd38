//! Run loop — alternates model calls and tool execution until the model
//! answers or the turn budget runs out.

use tracing::{debug, warn};

use tallybot_core::types::{ToolCallRequest, ToolCallResult, TurnInput};

use crate::agent::{Agent, AgentError, TurnOutcome};

/// Default number of model calls per run.
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// Returned instead of an answer when the budget is exhausted.
pub const MAX_TURNS_REACHED: &str = "Agent reached maximum execution turns.";

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// The model produced a final answer after `turns` model calls.
    Completed { text: String, turns: u32 },
    /// Every one of `turns` model calls asked for tools.
    MaxTurnsReached { turns: u32 },
}

impl RunOutcome {
    /// The final answer, or the max-turns sentinel.
    pub fn text(&self) -> &str {
        match self {
            RunOutcome::Completed { text, .. } => text,
            RunOutcome::MaxTurnsReached { .. } => MAX_TURNS_REACHED,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// Model calls made.
    pub fn turns(&self) -> u32 {
        match self {
            RunOutcome::Completed { turns, .. } | RunOutcome::MaxTurnsReached { turns } => *turns,
        }
    }
}

/// Progress hooks for a run. All methods default to no-ops.
pub trait RunObserver: Send + Sync {
    /// Called before model call number `turn` (1-based).
    fn on_iteration(&self, _turn: u32, _max_turns: u32) {}

    fn on_tool_call(&self, _call: &ToolCallRequest) {}

    fn on_tool_result(&self, _result: &ToolCallResult) {}

    fn on_final(&self, _text: &str) {}
}

struct Silent;

impl RunObserver for Silent {}

/// Run the agent on `user_text` for at most `max_turns` model calls.
pub async fn run(agent: &mut Agent, user_text: &str, max_turns: u32) -> Result<RunOutcome, AgentError> {
    run_with_observer(agent, user_text, max_turns, &Silent).await
}

/// [`run`], reporting progress to `observer`.
pub async fn run_with_observer(
    agent: &mut Agent,
    user_text: &str,
    max_turns: u32,
    observer: &dyn RunObserver,
) -> Result<RunOutcome, AgentError> {
    let mut input = TurnInput::UserText(user_text.to_string());

    for turn in 1..=max_turns {
        observer.on_iteration(turn, max_turns);

        match agent.process_turn(input).await? {
            TurnOutcome::Text(text) => {
                debug!(turns = turn, "run completed");
                observer.on_final(&text);
                return Ok(RunOutcome::Completed { text, turns: turn });
            }
            TurnOutcome::ToolCalls(calls) => {
                debug!(turn, count = calls.len(), "executing tool calls");
                let mut results = Vec::with_capacity(calls.len());
                for call in &calls {
                    observer.on_tool_call(call);
                    let result = agent.tools().execute(call).await;
                    observer.on_tool_result(&result);
                    results.push(result);
                }
                input = TurnInput::ToolResults(results);
            }
        }
    }

    warn!(max_turns, "run stopped at turn limit");
    Ok(RunOutcome::MaxTurnsReached { turns: max_turns })
}
