//! Tool Registry — name-keyed store the run loop dispatches tool calls through.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use tallybot_core::types::{ToolCallRequest, ToolCallResult, ToolSchema};

use super::base::Tool;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
///
/// Owns `Arc<dyn Tool>` so tools can be shared across threads.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        info!(tool = tool.name(), "registered tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Schemas for every registered tool, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Execute one requested call.
    ///
    /// Never fails: an unknown tool or a tool fault becomes an
    /// `{"error": ...}` payload so the model can see it and recover.
    pub async fn execute(&self, call: &ToolCallRequest) -> ToolCallResult {
        let payload = match self.tools.get(&call.name) {
            Some(tool) => {
                debug!(tool = %call.name, call_id = %call.id, "executing tool");
                tool.invoke(&call.arguments).await
            }
            None => {
                warn!(tool = %call.name, "tool not found");
                json!({ "error": format!("Tool '{}' not found", call.name) })
            }
        };
        ToolCallResult::new(&call.id, &call.name, &payload)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::CalculatorTool;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::collections::BTreeMap;
    use tallybot_core::types::{ParamType, ParameterSpec};

    /// Minimal test tool.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters(&self) -> BTreeMap<String, ParameterSpec> {
            BTreeMap::from([(
                "text".to_string(),
                ParameterSpec::required(ParamType::String, "Text to echo"),
            )])
        }
        async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
            Ok(json!({ "echo": args.get("text").cloned().unwrap_or(Value::Null) }))
        }
    }

    fn call(id: &str, name: &str, args: Value) -> ToolCallRequest {
        ToolCallRequest::new(id, name, args.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_register_and_lookup() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert!(reg.has("echo"));
        assert!(!reg.has("nope"));
        assert!(reg.get("echo").is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_register_overwrites_same_name() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_names_and_schemas_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(CalculatorTool));
        assert_eq!(reg.tool_names(), vec!["calculator", "echo"]);
        let names: Vec<String> = reg.schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["calculator", "echo"]);
    }

    #[tokio::test]
    async fn test_execute_success() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let result = reg.execute(&call("c1", "echo", json!({"text": "hello"}))).await;
        assert_eq!(result.call_id, "c1");
        assert_eq!(result.name, "echo");
        assert_eq!(result.payload().unwrap(), json!({"echo": "hello"}));
    }

    #[tokio::test]
    async fn test_execute_not_found() {
        let reg = ToolRegistry::new();
        let result = reg.execute(&call("c9", "missing", json!({}))).await;
        assert_eq!(result.call_id, "c9");
        assert_eq!(
            result.payload().unwrap(),
            json!({"error": "Tool 'missing' not found"})
        );
    }

    #[tokio::test]
    async fn test_execute_tool_error_is_payload() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(CalculatorTool));
        let result = reg
            .execute(&call("c1", "calculator", json!({"expression": "1/0"})))
            .await;
        assert_eq!(result.payload().unwrap(), json!({"error": "division by zero"}));
    }

    #[test]
    fn test_default() {
        let reg = ToolRegistry::default();
        assert!(reg.is_empty());
    }
}
