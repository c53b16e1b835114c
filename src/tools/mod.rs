pub mod handlers;
pub mod registry;

pub use registry::{Tool, ToolDefinition, ToolRegistry};

use crate::preview::BuildCache;
use crate::process::ProcessManager;
use crate::store::Store;
use std::path::PathBuf;
use std::sync::Arc;

/// Build the registry with every tool named in §4.8, wired against one
/// store handle, one process manager, and one workspace root.
pub fn build_default_registry(
    store: Arc<dyn Store>,
    processes: Arc<ProcessManager>,
    workspace_root: PathBuf,
    build_cache: BuildCache,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(handlers::tasks::CreateTaskTool { store: store.clone() }));
    registry.register(Arc::new(handlers::tasks::UpdateTaskTool { store: store.clone() }));
    registry.register(Arc::new(handlers::tasks::ListTasksTool { store: store.clone() }));
    registry.register(Arc::new(handlers::tasks::DeleteTaskTool { store: store.clone() }));
    registry.register(Arc::new(handlers::tasks::AddTaskCommentTool { store: store.clone() }));

    registry.register(Arc::new(handlers::files::CreateFileTool { store: store.clone() }));
    registry.register(Arc::new(handlers::files::UpdateFileTool { store: store.clone() }));
    registry.register(Arc::new(handlers::files::ReadFilesTool { store: store.clone() }));
    registry.register(Arc::new(handlers::files::SearchCodeTool { store: store.clone() }));
    registry.register(Arc::new(handlers::files::DeleteFileTool { store: store.clone() }));

    registry.register(Arc::new(handlers::build::TriggerBuildTool {
        file_store: store.clone(),
        error_store: store.clone(),
        workspace_root: workspace_root.clone(),
        cache: build_cache,
    }));
    registry.register(Arc::new(handlers::build::GetOpenErrorsTool { error_store: store.clone() }));
    registry.register(Arc::new(handlers::build::ResolveErrorTool { error_store: store.clone() }));

    registry.register(Arc::new(handlers::sandbox::RunSqlQueryTool {
        workspace_root: workspace_root.clone(),
    }));
    registry.register(Arc::new(handlers::sandbox::GetSqlSchemaTool {
        workspace_root: workspace_root.clone(),
    }));
    registry.register(Arc::new(handlers::sandbox::RunMigrationTool {
        workspace_root: workspace_root.clone(),
    }));
    registry.register(Arc::new(handlers::sandbox::RunPythonScriptTool {
        workspace_root: workspace_root.clone(),
    }));
    registry.register(Arc::new(handlers::sandbox::ReadLogsTool {
        workspace_root: workspace_root.clone(),
    }));
    registry.register(Arc::new(handlers::sandbox::TestEndpointTool {
        workspace_root: workspace_root.clone(),
        processes,
    }));
    registry.register(Arc::new(handlers::sandbox::TroubleshootTool));

    registry.register(Arc::new(handlers::misc::EnableIntegrationTool));
    registry.register(Arc::new(handlers::misc::InstallPackagesTool { workspace_root }));
    registry.register(Arc::new(handlers::misc::VisualizeDataTool));
    registry.register(Arc::new(handlers::misc::RequestDataTool));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::PortPool;
    use crate::store::mock::MockStore;

    #[test]
    fn default_registry_registers_every_declared_tool() {
        let store: Arc<dyn Store> = Arc::new(MockStore::new());
        let processes = Arc::new(ProcessManager::new(Arc::new(PortPool::default())));
        let registry = build_default_registry(
            store,
            processes,
            tempfile::tempdir().unwrap().path().to_path_buf(),
            BuildCache::new(),
        );

        let expected = [
            "create_task", "update_task", "list_tasks", "delete_task", "add_task_comment",
            "create_file", "update_file", "read_files", "search_code", "delete_file",
            "run_migration", "run_sql_query", "get_sql_schema", "run_python_script",
            "read_logs", "test_endpoint", "troubleshoot", "enable_integration",
            "install_packages", "visualize_data", "request_data", "trigger_build",
            "get_open_errors", "resolve_error",
        ];
        let registered = registry.list();
        for name in expected {
            assert!(registered.contains(&name), "missing tool: {name}");
        }
        assert_eq!(registered.len(), expected.len());
    }
}
