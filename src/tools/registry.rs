//! The `Tool` trait and `ToolRegistry` dispatcher.
//!
//! Grounded directly on `agenticlaw-tools::registry`: same `Tool` trait
//! shape, same `HashMap<String, Arc<dyn Tool>>` registry, same
//! never-throws dispatch contract. `execute` takes and returns
//! `serde_json::Value` rather than the teacher's `ToolResult` enum, since
//! every caller here (the dialog loop, the HTTP tool-call surface) wants
//! JSON on both sides of the wire.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name, matching the model-facing tool declaration.
    fn name(&self) -> &str;

    /// Human-readable description sent to the model.
    fn description(&self) -> &str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value;

    /// Execute with already-parsed JSON arguments. Must never panic; a
    /// failure is reported as `{"success": false, "error": "..."}`
    /// rather than propagated.
    async fn execute(&self, args: Value) -> Value;
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Dispatch to the named tool. Unregistered names produce the same
    /// `{success:false, error}` shape a handler would return for a
    /// runtime failure, so the dialog loop never needs a separate
    /// not-found branch.
    pub async fn execute(&self, name: &str, args: Value) -> Value {
        match self.tools.get(name) {
            Some(tool) => tool.execute(args).await,
            None => json!({ "success": false, "error": format!("unknown tool: {name}") }),
        }
    }

    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

/// Pull a required string argument, or a ready-made error `Value`.
pub(crate) fn require_str(args: &Value, field: &str) -> Result<&str, Value> {
    args.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| json!({ "success": false, "error": format!("missing required argument: {field}") }))
}

pub(crate) fn optional_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes back its input"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, args: Value) -> Value {
            json!({"success": true, "echo": args})
        }
    }

    #[tokio::test]
    async fn unregistered_tool_returns_structured_error() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nonexistent", json!({})).await;
        assert_eq!(result["success"], json!(false));
        assert!(result["error"].as_str().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn registered_tool_dispatches() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let result = registry.execute("echo", json!({"a": 1})).await;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["echo"]["a"], json!(1));
    }

    #[test]
    fn get_definitions_lists_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let defs = registry.get_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}
