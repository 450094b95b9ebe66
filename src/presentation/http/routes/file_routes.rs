use axum::{Router, routing::get};
use std::sync::Arc;

use crate::presentation::http::handlers::FileHandler;

pub fn file_routes(handler: Arc<FileHandler>) -> Router {
    Router::new()
        .route("/files/{file_id}", get(FileHandler::get_file))
        .with_state(handler)
}
