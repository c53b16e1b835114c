//! API route definitions — the in-scope HTTP surface only: chat, file and
//! task mutation, error querying, preview build/serve, and per-project
//! backend lifecycle. Grounded on the teacher's `create_router` shape
//! (`CorsLayer`, `TraceLayer`, one `.route(path, method(handler))` chain).

use super::handlers::{self, OrchestratorState};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: OrchestratorState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ai-tools/chat/stream", post(handlers::chat_stream))
        .route("/ai-tools/files/create", post(handlers::create_file))
        .route("/ai-tools/files/update", put(handlers::update_file))
        .route("/ai-tools/files/read/{project}", get(handlers::read_files))
        .route("/ai-tools/tasks/create", post(handlers::create_task))
        .route("/ai-tools/tasks/update", post(handlers::update_task))
        .route("/ai-tools/tasks/add-comment", post(handlers::add_task_comment))
        .route("/ai-tools/errors/{project}", get(handlers::list_errors))
        .route("/ai-tools/errors/{project}/open", get(handlers::list_errors))
        .route("/preview/build/{project}", post(handlers::trigger_build))
        .route("/preview/{project}", get(handlers::preview_index))
        .route("/preview/{project}/assets/{*asset_path}", get(handlers::preview_asset))
        .route("/project-backend/start/{project}", post(handlers::backend_start))
        .route("/project-backend/stop/{project}", post(handlers::backend_stop))
        .route("/project-backend/restart/{project}", post(handlers::backend_restart))
        .route("/project-backend/status/{project}", get(handlers::backend_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
