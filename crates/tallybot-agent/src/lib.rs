//! Tallybot Agent — conversation state, tools, and the run loop.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and the calculator tool
//! - **agent**: conversation history + one model call per turn
//! - **runner**: the model ↔ tool loop with a turn budget

pub mod agent;
pub mod runner;
pub mod tools;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentError, AgentSettings, TurnOutcome};
pub use runner::{
    run, run_with_observer, RunObserver, RunOutcome, DEFAULT_MAX_TURNS, MAX_TURNS_REACHED,
};
pub use tools::{default_registry, CalculatorTool, Tool, ToolRegistry};
