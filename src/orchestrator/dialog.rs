//! Shared tool-calling dialog loop and error-recovery mode.
//!
//! Grounded on `ai_orchestrator.py`'s `_stream_with_tools` (the inner
//! conversation loop: call the model with tools, dispatch what it asks for,
//! feed results back, repeat) and `recover_from_error` (wraps the same loop
//! with a bounded number of retries, each one primed with the previous
//! attempt's failure).

use crate::model::{ModelClient, ModelMessage, ModelRequest};
use crate::tools::ToolRegistry;
use tokio::sync::mpsc::Sender;

const MAX_ITERATIONS: u32 = 5;
const MAX_RECOVERY_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub enum OrchestratorChunk {
    /// Plain assistant text.
    Text(String),
    /// A progress/status line not attributable to a single tool call.
    Status(String),
    /// The outcome of dispatching one tool call.
    ToolResult { tool: String, success: bool, detail: Option<String> },
    Warning(String),
    Done,
}

/// Runs the model/tool loop to completion (or [`MAX_ITERATIONS`]), mutating
/// `dialog` in place and streaming chunks to `tx`. Never panics: model and
/// tool-dispatch failures become [`OrchestratorChunk::Warning`]s and end the
/// loop rather than propagating. Returns `None` on a normal final answer, or
/// `Some(reason)` describing why the loop ended without one — callers that
/// retry (like [`recover_from_error`]) use `reason` to prime the next attempt.
pub async fn stream_with_tools(
    model: &dyn ModelClient,
    tools: &ToolRegistry,
    system_prompt: &str,
    dialog: &mut Vec<ModelMessage>,
    user_message: &str,
    tx: &Sender<OrchestratorChunk>,
) -> Option<String> {
    dialog.push(ModelMessage::user(user_message));

    for _ in 0..MAX_ITERATIONS {
        let request = ModelRequest::new(system_prompt, dialog.clone()).with_tools(tools.get_definitions());

        let completion = match model.complete(request).await {
            Ok(c) => c,
            Err(e) => {
                let reason = format!("model request failed: {e}");
                let _ = tx.send(OrchestratorChunk::Warning(reason.clone())).await;
                return Some(reason);
            }
        };

        if !completion.text.is_empty() {
            let _ = tx.send(OrchestratorChunk::Text(completion.text.clone())).await;
        }

        if completion.tool_calls.is_empty() {
            dialog.push(ModelMessage::assistant(completion.text));
            let _ = tx.send(OrchestratorChunk::Done).await;
            return None;
        }

        let _ = tx.send(OrchestratorChunk::Status("executing tools".into())).await;

        let mut assistant = ModelMessage::assistant(completion.text);
        assistant.tool_calls = completion.tool_calls.clone();
        dialog.push(assistant);

        for call in &completion.tool_calls {
            let result = tools.execute(&call.name, call.arguments.clone()).await;
            let success = result.get("success").and_then(|v| v.as_bool()).unwrap_or(true);
            let detail = result.get("error").and_then(|v| v.as_str()).map(str::to_string);
            let _ = tx
                .send(OrchestratorChunk::ToolResult { tool: call.name.clone(), success, detail })
                .await;
            dialog.push(ModelMessage::tool_result(call.id.clone(), result));
        }
    }

    let reason = format!("stopped after {MAX_ITERATIONS} tool-calling iterations without a final answer");
    let _ = tx.send(OrchestratorChunk::Warning(reason.clone())).await;
    Some(reason)
}

/// Debugging entry point for an externally-reported error (not reached via
/// [`super::intent::classify_intent`]): retries [`stream_with_tools`] against
/// the debugging system prompt, prefixing each retry with the prior
/// attempt's failure.
pub async fn recover_from_error(
    model: &dyn ModelClient,
    tools: &ToolRegistry,
    debugging_prompt: &str,
    error_message: &str,
    stack_trace: Option<&str>,
    context: Option<&serde_json::Value>,
    tx: &Sender<OrchestratorChunk>,
) {
    let mut error_context = format!("An error occurred:\n\nError Message: {error_message}\n\n");
    if let Some(stack) = stack_trace {
        error_context.push_str(&format!("Stack Trace:\n{stack}\n\n"));
    }
    if let Some(ctx) = context {
        error_context.push_str(&format!("Context: {ctx}\n\n"));
    }
    error_context.push_str(
        "Please:\n1. Analyze the error\n2. Use the troubleshoot tool to get diagnostic information\n\
3. Identify the root cause\n4. Suggest and implement a fix\n5. Verify the fix works\n",
    );

    for retry in 0..MAX_RECOVERY_RETRIES {
        if retry > 0 {
            let _ = tx
                .send(OrchestratorChunk::Status(format!(
                    "retry attempt {}/{MAX_RECOVERY_RETRIES}",
                    retry + 1
                )))
                .await;
        }

        let mut dialog = Vec::new();
        let outcome =
            stream_with_tools(model, tools, debugging_prompt, &mut dialog, &error_context, tx).await;

        match outcome {
            None => {
                let _ = tx.send(OrchestratorChunk::Status("fix attempt completed".into())).await;
                return;
            }
            Some(failure) => {
                error_context.push_str(&format!(
                    "\nPrevious attempt failed: {failure}\nTry a different approach.\n"
                ));
            }
        }
    }

    let _ = tx
        .send(OrchestratorChunk::Warning(format!(
            "recovery failed after {MAX_RECOVERY_RETRIES} attempts"
        )))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModelClient, ModelCompletion};
    use crate::tools::handlers::tasks::CreateTaskTool;
    use crate::store::mock::MockStore;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    async fn drain(mut rx: mpsc::Receiver<OrchestratorChunk>) -> Vec<OrchestratorChunk> {
        let mut out = Vec::new();
        while let Some(chunk) = rx.recv().await {
            out.push(chunk);
        }
        out
    }

    #[tokio::test]
    async fn no_tool_calls_yields_text_and_done() {
        let client = MockModelClient::new(vec![ModelCompletion { text: "hello there".into(), ..Default::default() }]);
        let tools = ToolRegistry::new();
        let mut dialog = Vec::new();
        let (tx, rx) = mpsc::channel(16);

        stream_with_tools(&client, &tools, "system", &mut dialog, "hi", &tx).await;
        drop(tx);
        let chunks = drain(rx).await;

        assert!(matches!(chunks.first(), Some(OrchestratorChunk::Text(t)) if t == "hello there"));
        assert!(matches!(chunks.last(), Some(OrchestratorChunk::Done)));
        assert_eq!(dialog.len(), 2);
    }

    #[tokio::test]
    async fn exceeding_max_iterations_emits_warning() {
        use crate::model::{ModelRole, ToolCall};

        let looping_completion = || ModelCompletion {
            text: String::new(),
            tool_calls: vec![ToolCall { id: "1".into(), name: "create_task".into(), arguments: json!({"project_id": uuid::Uuid::new_v4().to_string(), "title": "x"}) }],
            stop_reason: None,
        };
        let responses = (0..MAX_ITERATIONS).map(|_| looping_completion()).collect();
        let client = MockModelClient::new(responses);

        let mut tools = ToolRegistry::new();
        let store = Arc::new(MockStore::new());
        tools.register(Arc::new(CreateTaskTool { store }));

        let mut dialog = Vec::new();
        let (tx, rx) = mpsc::channel(64);
        stream_with_tools(&client, &tools, "system", &mut dialog, "loop forever", &tx).await;
        drop(tx);
        let chunks = drain(rx).await;

        assert!(chunks.iter().any(|c| matches!(c, OrchestratorChunk::Warning(msg) if msg.contains("iterations"))));
        let _ = ModelRole::User;
    }
}
