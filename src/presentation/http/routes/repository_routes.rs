use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::presentation::http::handlers::RepositoryHandler;

pub fn repository_routes(handler: Arc<RepositoryHandler>) -> Router {
    Router::new()
        .route(
            "/repositories",
            post(RepositoryHandler::register_repository).get(RepositoryHandler::list_repositories),
        )
        .route(
            "/repositories/{repository_id}",
            get(RepositoryHandler::get_repository).delete(RepositoryHandler::delete_repository),
        )
        .route(
            "/repositories/{repository_id}/status",
            post(RepositoryHandler::update_status),
        )
        .route(
            "/repositories/{repository_id}/logs",
            get(RepositoryHandler::list_logs),
        )
        .route(
            "/repositories/{repository_id}/tree",
            get(RepositoryHandler::get_tree),
        )
        .route(
            "/repositories/{repository_id}/files",
            get(RepositoryHandler::list_files),
        )
        .with_state(handler)
}
