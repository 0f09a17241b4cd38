//! Errors raised while turning caller input into conversation turns.

use thiserror::Error;

/// Failures building a conversation turn from a [`crate::types::TurnInput`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// A tool-results input must carry at least one result.
    #[error("tool results input is empty")]
    EmptyToolResults,

    /// A tool result's content was not valid JSON.
    #[error("result of tool '{name}' is not valid JSON: {source}")]
    MalformedToolResult {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
