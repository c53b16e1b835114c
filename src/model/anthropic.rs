//! Concrete [`ModelClient`] backed by the Anthropic Messages API.
//!
//! Grounded on `agenticlaw-llm::anthropic::AnthropicProvider` for the wire
//! shape (request/response field names, SSE event types), but redirected
//! per §C9 onto this crate's own dependency stack: `reqwest` for the HTTP
//! call and `eventsource-stream`'s `Eventsource` extension trait for SSE
//! framing, rather than the teacher's private client crate and hand-rolled
//! `async_stream` parser.

use super::provider::{ModelClient, ModelError, ModelResult};
use super::types::{ModelCompletion, ModelRequest, ModelRole, ToolCall};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    /// `model` is caller-supplied (config/env), never hardcoded here — the
    /// client is agnostic to which model string it is pointed at.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn build_request_body(&self, request: &ModelRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != ModelRole::System)
            .map(message_to_wire)
            .collect();

        let mut body = json!({
            "model": self.model,
            "system": request.system,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": true,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }
}

fn message_to_wire(message: &super::types::ModelMessage) -> Value {
    match message.role {
        ModelRole::User => json!({"role": "user", "content": message.content}),
        ModelRole::Assistant => {
            if message.tool_calls.is_empty() {
                json!({"role": "assistant", "content": message.content})
            } else {
                let mut blocks = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(json!({"type": "text", "text": message.content}));
                }
                for call in &message.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                json!({"role": "assistant", "content": blocks})
            }
        }
        ModelRole::Tool => {
            let result = message.tool_result.as_ref();
            json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": result.map(|r| r.tool_call_id.as_str()).unwrap_or_default(),
                    "content": result.map(|r| r.content.clone()).unwrap_or(Value::Null),
                }],
            })
        }
        ModelRole::System => json!({"role": "user", "content": message.content}),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart,
    ContentBlockStart {
        index: usize,
        content_block: ContentBlockStart,
    },
    ContentBlockDelta {
        index: usize,
        delta: ContentBlockDelta,
    },
    ContentBlockStop {
        #[allow(dead_code)]
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
    },
    MessageStop,
    Ping,
    Error {
        error: ErrorBody,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockStart {
    Text {
        #[allow(dead_code)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct MessageDeltaBody {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

#[derive(Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments_json: String,
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: ModelRequest) -> ModelResult<ModelCompletion> {
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ModelError::AuthFailed("invalid API key".into()));
        }
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(ModelError::RateLimited { retry_after_ms });
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::RequestFailed(format!("{status}: {text}")));
        }

        let mut text = String::new();
        let mut tool_calls: Vec<PendingToolCall> = Vec::new();
        let mut stop_reason = None;

        let mut stream = response.bytes_stream().eventsource();
        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| ModelError::RequestFailed(e.to_string()))?;
            if event.data.is_empty() {
                continue;
            }
            let parsed: StreamEvent = match serde_json::from_str(&event.data) {
                Ok(p) => p,
                Err(_) => continue,
            };
            match parsed {
                StreamEvent::ContentBlockStart { index, content_block } => match content_block {
                    ContentBlockStart::Text { .. } => {}
                    ContentBlockStart::ToolUse { id, name } => {
                        while tool_calls.len() <= index {
                            tool_calls.push(PendingToolCall::default());
                        }
                        tool_calls[index].id = id;
                        tool_calls[index].name = name;
                    }
                },
                StreamEvent::ContentBlockDelta { index, delta } => match delta {
                    ContentBlockDelta::TextDelta { text: chunk } => text.push_str(&chunk),
                    ContentBlockDelta::InputJsonDelta { partial_json } => {
                        while tool_calls.len() <= index {
                            tool_calls.push(PendingToolCall::default());
                        }
                        tool_calls[index].arguments_json.push_str(&partial_json);
                    }
                },
                StreamEvent::MessageDelta { delta } => {
                    if delta.stop_reason.is_some() {
                        stop_reason = delta.stop_reason;
                    }
                }
                StreamEvent::Error { error } => {
                    return Err(ModelError::RequestFailed(format!("{}: {}", error.kind, error.message)));
                }
                StreamEvent::MessageStart
                | StreamEvent::ContentBlockStop { .. }
                | StreamEvent::MessageStop
                | StreamEvent::Ping => {}
            }
        }

        let tool_calls = tool_calls
            .into_iter()
            .filter(|t| !t.name.is_empty())
            .map(|t| {
                let arguments = if t.arguments_json.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&t.arguments_json).unwrap_or(Value::Null)
                };
                ToolCall { id: t.id, name: t.name, arguments }
            })
            .collect();

        Ok(ModelCompletion { text, tool_calls, stop_reason })
    }
}
