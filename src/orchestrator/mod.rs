//! The generation pipeline: intent routing, planning, code generation,
//! auto-healing, and the shared tool-calling dialog.
//!
//! Grounded on `ai_orchestrator.py`'s `AIOrchestrator` (the intent-routed
//! `generate_with_planning` entry point) and the teacher's
//! `orchestrator::runner::Orchestrator` (one struct holding every
//! dependency as an `Arc`, a per-scope concurrency guard, and
//! `tokio::spawn` for the streaming path).

pub mod dialog;
pub mod generator;
pub mod healer;
pub mod intent;
pub mod planner;

pub use dialog::{recover_from_error, stream_with_tools, OrchestratorChunk};
pub use healer::{auto_heal, heal_validation_errors, HealOutcome};
pub use intent::{classify_intent, Intent};
pub use planner::{create_project_plan, Plan};

use crate::context::{ContextLimits, ContextLoader};
use crate::model::{ModelClient, ModelMessage};
use crate::packages::detect_packages;
use crate::store::{ChatRole, ChatStore, ContextData, ErrorRecordStore};
use crate::tools::ToolRegistry;
use crate::validator::Language;
use dashmap::DashMap;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

const GENERAL_SYSTEM_PROMPT: &str = "\
You are an AI assistant embedded in an app-building tool. You can read and \
write the user's generated project files, manage their tasks, and inspect \
their database through the tools available to you. Use them when a request \
needs information you don't already have, or needs a change made. Keep \
replies concise and focused on what changed.";

const DEBUGGING_SYSTEM_PROMPT: &str = "\
You are debugging a generated application. Use the available tools to \
inspect open errors, read the implicated files, and make the smallest \
change that resolves the root cause. Verify by triggering a build after any \
fix. Explain what was wrong and what you changed.";

/// Dialog state and concurrency guard for one `(project_id, session_id)`
/// conversation. Holding this behind a `Mutex` means a second concurrent
/// `generate_with_planning` call for the same session waits for the first
/// to finish appending to `dialog` rather than racing it.
#[derive(Debug, Default)]
pub struct Session {
    pub dialog: Vec<ModelMessage>,
}

pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    context: Arc<ContextLoader>,
    chat: Arc<dyn ChatStore>,
    errors: Arc<dyn ErrorRecordStore>,
    sessions: DashMap<(Uuid, String), Arc<Mutex<Session>>>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        context: Arc<ContextLoader>,
        chat: Arc<dyn ChatStore>,
        errors: Arc<dyn ErrorRecordStore>,
    ) -> Self {
        Self { model, tools, context, chat, errors, sessions: DashMap::new() }
    }

    fn session_handle(&self, project_id: Uuid, session_id: &str) -> Arc<Mutex<Session>> {
        self.sessions
            .entry((project_id, session_id.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(Session::default())))
            .clone()
    }

    /// Drops the cached dialog for a session without touching persisted
    /// chat history or agent memory.
    pub fn forget_session(&self, project_id: Uuid, session_id: &str) {
        self.sessions.remove(&(project_id, session_id.to_string()));
    }

    /// Gives the model one shot at fixing a file that failed validation
    /// before being written, so a transient mistake doesn't bounce straight
    /// back to the caller as a 400.
    pub async fn heal_file_validation(&self, language: Language, content: &str) -> Option<String> {
        heal_validation_errors(self.model.as_ref(), language, content).await
    }

    /// Routes `user_message` through intent classification into planning,
    /// debugging, or general chat, streaming progress and text chunks back
    /// on the returned stream. Spawned as a background task so the caller
    /// (the `/ai-tools/chat/stream` handler) can forward chunks to the
    /// client as they arrive rather than buffering the whole turn.
    pub fn generate_with_planning(
        self: &Arc<Self>,
        project_id: Uuid,
        session_id: String,
        user_message: String,
    ) -> ReceiverStream<OrchestratorChunk> {
        let (tx, rx) = mpsc::channel(64);
        let orchestrator = self.clone();

        tokio::spawn(async move {
            orchestrator.run_turn(project_id, &session_id, &user_message, tx).await;
        });

        ReceiverStream::new(rx)
    }

    async fn run_turn(
        &self,
        project_id: Uuid,
        session_id: &str,
        user_message: &str,
        tx: mpsc::Sender<OrchestratorChunk>,
    ) {
        let _ = self.chat.append_message(project_id, ChatRole::User, user_message).await;

        let snapshot = match self.context.load(project_id, ContextLimits::default()).await {
            Ok(s) => Some(s),
            Err(e) => {
                let _ = tx.send(OrchestratorChunk::Warning(format!("context load failed: {e}"))).await;
                None
            }
        };
        let rendered_context = snapshot.as_ref().map(|s| s.render());

        let intent = classify_intent(self.model.as_ref(), user_message).await;
        let _ = tx.send(OrchestratorChunk::Status(format!("intent: {intent:?}"))).await;

        match intent {
            Intent::FeatureRequest => self.run_feature_request(project_id, user_message, &tx).await,
            Intent::Debug => {
                let system = with_context(DEBUGGING_SYSTEM_PROMPT, rendered_context.as_deref());
                self.run_dialog_turn(project_id, session_id, user_message, &system, &tx).await;
            }
            Intent::Question | Intent::Chat => {
                let system = with_context(GENERAL_SYSTEM_PROMPT, rendered_context.as_deref());
                self.run_dialog_turn(project_id, session_id, user_message, &system, &tx).await;
            }
        }
    }

    async fn run_dialog_turn(
        &self,
        project_id: Uuid,
        session_id: &str,
        user_message: &str,
        system_prompt: &str,
        tx: &mpsc::Sender<OrchestratorChunk>,
    ) {
        let handle = self.session_handle(project_id, session_id);
        let mut session = handle.lock().await;
        stream_with_tools(self.model.as_ref(), &self.tools, system_prompt, &mut session.dialog, user_message, tx)
            .await;

        if let Some(last) = session.dialog.last() {
            let _ = self.chat.append_message(project_id, ChatRole::Assistant, &last.content).await;
        }
    }

    async fn run_feature_request(&self, project_id: Uuid, user_message: &str, tx: &mpsc::Sender<OrchestratorChunk>) {
        let _ = tx.send(OrchestratorChunk::Status("creating project plan".into())).await;

        let plan = match create_project_plan(self.model.as_ref(), user_message).await {
            Ok(p) => p,
            Err(e) => {
                let _ = tx.send(OrchestratorChunk::Warning(format!("planning failed: {e}"))).await;
                return;
            }
        };

        let _ = tx
            .send(OrchestratorChunk::Status(format!(
                "plan: {} tasks, {} tables, {} apis, {} pages",
                plan.tasks.len(),
                plan.database_schema.len(),
                plan.apis.len(),
                plan.pages.len()
            )))
            .await;

        let mut task_ids = Vec::new();
        for task in &plan.tasks {
            let result = self
                .tools
                .execute(
                    "create_task",
                    json!({
                        "project_id": project_id,
                        "title": task.title,
                        "description": task.description,
                        "priority": task.priority,
                    }),
                )
                .await;
            let success = result["success"].as_bool().unwrap_or(false);
            let detail = result["task"]["id"].as_str().map(str::to_string).or_else(|| result["error"].as_str().map(str::to_string));
            if success {
                if let Some(id) = &detail {
                    task_ids.push(id.clone());
                }
            }
            let _ = tx.send(OrchestratorChunk::ToolResult { tool: "create_task".into(), success, detail }).await;
        }

        if !plan.database_schema.is_empty() {
            let result = self
                .tools
                .execute(
                    "run_migration",
                    json!({
                        "project_id": project_id,
                        "migration_name": "auto_generated_schema",
                        "sql": plan.migration_sql(),
                    }),
                )
                .await;
            let success = result["success"].as_bool().unwrap_or(false);
            let detail = result["error"].as_str().map(str::to_string);
            let _ = tx.send(OrchestratorChunk::ToolResult { tool: "run_migration".into(), success, detail }).await;
        }

        let mut python_sources: Vec<String> = Vec::new();
        let mut node_sources: Vec<String> = Vec::new();

        for api in &plan.apis {
            match generator::generate_api_code(self.model.as_ref(), api).await {
                Ok((name, code)) => {
                    let result = self
                        .tools
                        .execute(
                            "create_file",
                            json!({
                                "project_id": project_id,
                                "path": generator::api_file_path(&name),
                                "content": code,
                            }),
                        )
                        .await;
                    let success = result["success"].as_bool().unwrap_or(false);
                    let detail = result["error"].as_str().map(str::to_string);
                    if success {
                        python_sources.push(code);
                    }
                    let _ = tx.send(OrchestratorChunk::ToolResult { tool: format!("create_file:{name}"), success, detail }).await;
                }
                Err(e) => {
                    let _ = tx.send(OrchestratorChunk::Warning(format!("code generation failed for {}: {e}", api.endpoint))).await;
                }
            }
        }

        for page in &plan.pages {
            match generator::generate_page_code(self.model.as_ref(), page).await {
                Ok(code) => {
                    let result = self
                        .tools
                        .execute(
                            "create_file",
                            json!({
                                "project_id": project_id,
                                "path": generator::page_file_path(&page.name),
                                "content": code,
                            }),
                        )
                        .await;
                    let success = result["success"].as_bool().unwrap_or(false);
                    let detail = result["error"].as_str().map(str::to_string);
                    if success {
                        node_sources.push(code);
                    }
                    let _ = tx.send(OrchestratorChunk::ToolResult { tool: format!("create_file:{}", page.name), success, detail }).await;
                }
                Err(e) => {
                    let _ = tx.send(OrchestratorChunk::Warning(format!("code generation failed for {}: {e}", page.name))).await;
                }
            }
        }

        self.harvest_and_install_packages(project_id, &python_sources, &node_sources, &tx).await;

        let heal_outcome = auto_heal(self.model.as_ref(), &self.tools, &self.errors, project_id).await;
        let _ = tx
            .send(OrchestratorChunk::Status(format!(
                "auto-heal: build {}, {} fix attempts",
                if heal_outcome.build_succeeded { "succeeded" } else { "still failing" },
                heal_outcome.attempts.len()
            )))
            .await;

        let update = ContextData {
            current_phase: Some("code_generation_complete".to_string()),
            current_task: Some("feature_request".to_string()),
            tasks_completed: task_ids.into_iter().collect(),
            ..Default::default()
        };
        let _ = self.context.update_memory(project_id, update, true).await;

        let _ = tx.send(OrchestratorChunk::Done).await;
    }

    /// Reads every file just generated, detects the packages its imports
    /// require, and installs the python and node sets in separate batches
    /// before healing runs — a generated file that imports an uninstalled
    /// package would otherwise show up as a build error the healer has to
    /// rediscover from scratch.
    async fn harvest_and_install_packages(
        &self,
        project_id: Uuid,
        python_sources: &[String],
        node_sources: &[String],
        tx: &mpsc::Sender<OrchestratorChunk>,
    ) {
        let python_packages: BTreeSet<String> =
            python_sources.iter().flat_map(|src| detect_packages(Language::Python, src)).collect();
        let node_packages: BTreeSet<String> =
            node_sources.iter().flat_map(|src| detect_packages(Language::Typescript, src)).collect();

        for (packages, manager) in
            [(python_packages, "pip"), (node_packages, "npm")].into_iter().filter(|(p, _)| !p.is_empty())
        {
            let packages: Vec<String> = packages.into_iter().collect();
            let result = self
                .tools
                .execute(
                    "install_packages",
                    json!({"project_id": project_id, "packages": packages, "package_manager": manager}),
                )
                .await;
            let success = result["success"].as_bool().unwrap_or(false);
            let detail = result["error"].as_str().map(str::to_string);
            let _ = tx.send(OrchestratorChunk::ToolResult { tool: format!("install_packages:{manager}"), success, detail }).await;
        }
    }
}

fn with_context(system_prompt: &str, rendered_context: Option<&str>) -> String {
    match rendered_context {
        Some(context) if !context.is_empty() => format!("{context}\n\n---\n\n{system_prompt}"),
        _ => system_prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModelClient, ModelCompletion};
    use crate::store::mock::MockStore;
    use tokio_stream::StreamExt;

    fn build_orchestrator(store: Arc<MockStore>, responses: Vec<ModelCompletion>) -> Arc<Orchestrator> {
        let model: Arc<dyn ModelClient> = Arc::new(MockModelClient::new(responses));
        let tools = Arc::new(ToolRegistry::new());
        let context = Arc::new(ContextLoader::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        Arc::new(Orchestrator::new(model, tools, context, store.clone(), store))
    }

    #[tokio::test]
    async fn chat_intent_streams_text_and_persists_reply() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let orchestrator = build_orchestrator(
            store.clone(),
            vec![
                ModelCompletion { text: "chat".into(), ..Default::default() },
                ModelCompletion { text: "hello! how can I help?".into(), ..Default::default() },
            ],
        );

        let mut stream = orchestrator.generate_with_planning(project.id, "session-a".into(), "hi there".into());
        let mut texts = Vec::new();
        while let Some(chunk) = stream.next().await {
            if let OrchestratorChunk::Text(t) = chunk {
                texts.push(t);
            }
        }
        assert_eq!(texts, vec!["hello! how can I help?".to_string()]);

        let history = store.recent_messages(project.id, 10).await.unwrap();
        assert!(history.iter().any(|m| m.content == "hi there"));
        assert!(history.iter().any(|m| m.content == "hello! how can I help?"));
    }

    #[tokio::test]
    async fn repeated_sessions_reuse_cached_dialog() {
        let store = Arc::new(MockStore::new());
        let project = store.create_project("Demo", "desc").await.unwrap();
        let orchestrator = build_orchestrator(
            store.clone(),
            vec![
                ModelCompletion { text: "chat".into(), ..Default::default() },
                ModelCompletion { text: "first reply".into(), ..Default::default() },
            ],
        );

        let mut stream = orchestrator.generate_with_planning(project.id, "session-b".into(), "first".into());
        while stream.next().await.is_some() {}

        let handle = orchestrator.session_handle(project.id, "session-b");
        assert_eq!(handle.lock().await.dialog.len(), 2);
    }
}
