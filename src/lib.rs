//! App Forge Orchestrator
//!
//! An AI agent orchestrator that plans, generates, builds and auto-heals
//! small generated applications from a natural-language request:
//! - SQLite store for projects, files, tasks, chat history and errors
//! - A tool-calling dispatcher the model drives to read/write the project
//! - A preview build pipeline and a per-project backend process manager

pub mod api;
pub mod context;
pub mod error_feed;
pub mod model;
pub mod orchestrator;
pub mod packages;
pub mod preview;
pub mod process;
pub mod store;
pub mod tools;
pub mod validator;
pub mod workspace;

#[cfg(test)]
pub mod test_helpers;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use context::ContextLoader;
use model::{AnthropicClient, ModelClient};
use orchestrator::Orchestrator;
use preview::BuildCache;
use process::{PortPool, ProcessManager};
use store::SqliteStore;
use tools::ToolRegistry;

/// Shared application state, handed to every `api` handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub processes: Arc<ProcessManager>,
    pub tools: Arc<ToolRegistry>,
    pub context: Arc<ContextLoader>,
    pub orchestrator: Arc<Orchestrator>,
    pub build_cache: BuildCache,
    pub config: Arc<Config>,
}

/// Application configuration, loaded from the environment (`.env` first).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub base_port: u16,
    pub max_concurrent_backends: u16,
    pub workspace_base: PathBuf,
    pub server_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "orchestrator.db".into()),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            anthropic_model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5".into()),
            base_port: std::env::var("BASE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8001),
            max_concurrent_backends: std::env::var("MAX_CONCURRENT_BACKENDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            workspace_base: std::env::var("WORKSPACE_BASE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".preview-builds")),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .unwrap_or(8080),
        })
    }
}

impl AppState {
    /// Create new application state with every service wired together.
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(std::path::Path::new(&config.database_url))?);

        let ports = Arc::new(PortPool::new(config.base_port, config.max_concurrent_backends));
        let processes = Arc::new(ProcessManager::new(ports));

        std::fs::create_dir_all(&config.workspace_base)?;
        let build_cache = BuildCache::new();

        let tools = Arc::new(tools::build_default_registry(
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

        let model: Arc<dyn ModelClient> =
            Arc::new(AnthropicClient::new(config.anthropic_api_key.clone(), config.anthropic_model.clone()));

        let orchestrator = Arc::new(Orchestrator::new(
            model,
            tools.clone(),
            context.clone(),
            store.clone(),
            store.clone(),
        ));

        Ok(Self {
            store,
            processes,
            tools,
            context,
            orchestrator,
            build_cache,
            config: Arc::new(config),
        })
    }
}
