//! Mock `AppState` builder for handler-level tests.
//!
//! Mirrors the teacher's `mock_app_state()` factory, but backed by an
//! in-memory [`SqliteStore`] rather than a store-specific mock — `AppState`
//! holds the concrete store type, so an in-memory database plays the same
//! role here that a `MockGraphStore` plays for the teacher.
#![allow(dead_code)]

use crate::context::ContextLoader;
use crate::model::{MockModelClient, ModelClient, ModelCompletion};
use crate::orchestrator::Orchestrator;
use crate::preview::BuildCache;
use crate::process::{PortPool, ProcessManager};
use crate::store::SqliteStore;
use crate::tools::build_default_registry;
use crate::{AppState, Config};
use std::path::PathBuf;
use std::sync::Arc;

pub fn test_config(workspace_base: PathBuf) -> Config {
    Config {
        database_url: ":memory:".into(),
        anthropic_api_key: "test-key".into(),
        anthropic_model: "test-model".into(),
        base_port: 19500,
        max_concurrent_backends: 10,
        workspace_base,
        server_port: 0,
    }
}

/// Build an `AppState` wired against an in-memory store, a scripted model
/// client and a temp-dir workspace root. The returned `TempDir` must be
/// held by the caller for the lifetime of the test — dropping it deletes
/// the workspace.
pub async fn mock_app_state(responses: Vec<ModelCompletion>) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path().to_path_buf());

    let store = Arc::new(SqliteStore::open_in_memory().expect("in-memory store"));
    let ports = Arc::new(PortPool::new(config.base_port, config.max_concurrent_backends));
    let processes = Arc::new(ProcessManager::new(ports));
    let build_cache = BuildCache::new();

    let tools = Arc::new(build_default_registry(
        store.clone(),
        processes.clone(),
        config.workspace_base.clone(),
        build_cache.clone(),
    ));
    let context = Arc::new(ContextLoader::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let model: Arc<dyn ModelClient> = Arc::new(MockModelClient::new(responses));
    let orchestrator =
        Arc::new(Orchestrator::new(model, tools.clone(), context.clone(), store.clone(), store.clone()));

    let state = AppState { store, processes, tools, context, orchestrator, build_cache, config: Arc::new(config) };
    (state, dir)
}

pub fn empty_completion(text: &str) -> ModelCompletion {
    ModelCompletion { text: text.to_string(), ..Default::default() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProjectStore;

    #[tokio::test]
    async fn mock_app_state_builds_every_dependency() {
        let (state, _dir) = mock_app_state(vec![empty_completion("hi")]).await;
        assert_eq!(state.tools.list().len(), 24);
    }

    #[tokio::test]
    async fn mock_app_state_store_is_usable() {
        let (state, _dir) = mock_app_state(vec![]).await;
        let project = state.store.create_project("Demo", "desc").await.unwrap();
        assert_eq!(project.title, "Demo");
    }
}
