//! Request/response shapes for [`super::provider::ModelClient`].
//!
//! Grounded on `agenticlaw-llm::types` (`LlmRequest`/`LlmMessage`/
//! `ContentBlock`/`LlmTool`) — same message/content-block split, renamed
//! to this crate's domain and simplified to a non-streaming contract
//! (§C9: the orchestrator's inner tool loop calls the model
//! non-streaming and handles its own chunk emission).

use crate::tools::ToolDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub tool_call_id: String,
    pub content: serde_json::Value,
}

/// One turn of dialog. `content` carries plain text; `tool_calls` is only
/// populated on an assistant turn that invoked tools; `tool_results`
/// carries the dispatcher output for the following `Tool`-role turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: ModelRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResultMessage>,
}

impl ModelMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            role: ModelRole::Tool,
            content: String::new(),
            tool_calls: Vec::new(),
            tool_result: Some(ToolResultMessage {
                tool_call_id: tool_call_id.into(),
                content,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelRequest {
    pub fn new(system: impl Into<String>, messages: Vec<ModelMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            tools: Vec::new(),
            temperature: 0.7,
            max_tokens: 8192,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Result of a completed (non-streaming, from the caller's view) call.
#[derive(Debug, Clone, Default)]
pub struct ModelCompletion {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: Option<String>,
}
