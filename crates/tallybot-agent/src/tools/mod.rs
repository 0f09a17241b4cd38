//! Tool modules for the Tallybot agent.

pub mod arith;
pub mod base;
pub mod calculator;
pub mod registry;

use std::sync::Arc;

pub use base::{require_string, Tool};
pub use calculator::CalculatorTool;
pub use registry::ToolRegistry;

/// Registry with the built-in tools (currently just the calculator).
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculatorTool));
    registry
}
