//! Tallybot Core — shared types, configuration, and utilities.
//!
//! This crate contains:
//! - **types**: conversation messages, tool schemas, tool calls/results, LLM responses
//! - **error**: errors raised while assembling conversation turns
//! - **config**: JSON config schema, loader, and env var overrides
//! - **utils**: data directory and string helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::CoreError;
pub use types::{
    LlmResponse, Message, MessageContent, ParamType, ParameterSpec, Role, ToolCallRequest,
    ToolCallResult, ToolResultPart, ToolSchema, TurnInput, UsageInfo,
};
