//! App Forge Orchestrator - Main Server
//!
//! AI agent orchestrator that plans, generates, builds and auto-heals
//! small generated applications from a natural-language request.

use anyhow::Result;
use app_forge_orchestrator::{api, store::ProjectStore, AppState, Config};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(about = "AI App Forge Orchestrator Server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Workspace maintenance
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },
}

#[derive(Subcommand)]
enum WorkspaceCommands {
    /// Remove on-disk workspaces whose project no longer exists
    Gc,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,app_forge_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port } => {
            config.server_port = port;
            run_server(config).await
        }
        Commands::Workspace { command: WorkspaceCommands::Gc } => run_workspace_gc(config).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    tracing::info!("Starting App Forge Orchestrator server...");
    tracing::info!("Opening store at {}...", config.database_url);

    let state = Arc::new(AppState::new(config.clone()).await?);
    tracing::info!("Store ready, orchestrator and tool registry wired");

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Removes `WORKSPACE_BASE` subdirectories whose name isn't a project the
/// store still knows about — a generated app's files live in SQLite, the
/// on-disk workspace is rebuildable scratch space.
async fn run_workspace_gc(config: Config) -> Result<()> {
    let state = AppState::new(config).await?;
    let mut removed = 0usize;
    let mut kept = 0usize;

    let mut entries = tokio::fs::read_dir(&state.config.workspace_base).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Some(project_id) = entry.file_name().to_str().and_then(|s| Uuid::parse_str(s).ok()) else {
            continue;
        };
        match state.store.get_project(project_id).await {
            Ok(_) => kept += 1,
            Err(_) => {
                tokio::fs::remove_dir_all(entry.path()).await?;
                removed += 1;
            }
        }
    }

    tracing::info!("workspace gc: removed {removed}, kept {kept}");
    Ok(())
}
