//! Tool trait — the abstract interface every agent tool must implement.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use tallybot_core::types::{ParameterSpec, ToolSchema};

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The registry discovers tools via `name()`, sends their schemas to the
/// model via `schema()`, and dispatches calls via `invoke()`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used by the model to call this tool (e.g. `"calculator"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Parameters keyed by name.
    fn parameters(&self) -> BTreeMap<String, ParameterSpec>;

    /// Schema sent to the model. Side-effect free; equal on every call.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Execute the tool with the given arguments.
    ///
    /// Returns a JSON payload. On failure, return an `Err`; `invoke` turns
    /// it into an `{"error": ...}` payload for the model.
    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<Value>;

    /// Execute and fold any failure into an error payload.
    ///
    /// Never fails: this is what the run loop calls.
    async fn invoke(&self, args: &Map<String, Value>) -> Value {
        match self.execute(args).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(tool = self.name(), error = %e, "tool execution failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required string argument, returning a user-friendly error.
pub fn require_string<'a>(args: &'a Map<String, Value>, key: &str) -> anyhow::Result<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => anyhow::bail!("Parameter '{key}' must be a string, got {other}"),
        None => anyhow::bail!("Missing required parameter: {key}"),
    }
}
