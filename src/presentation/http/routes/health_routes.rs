use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::domain::stores::Store;
use crate::presentation::http::dto::{ApiResponse, HealthResponseDto, StoreHealthDto};

pub fn health_routes(store: Store) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(store)
}

async fn root_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::success(env!("CARGO_PKG_NAME"))),
    )
}

/// Reports 503 when the store cannot be reached.
async fn health_handler(State(store): State<Store>) -> impl IntoResponse {
    let ping = store.ping().await;
    let (code, status) = match &ping {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let health_response = HealthResponseDto {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store: StoreHealthDto {
            backend: store.backend_name(),
            reachable: ping.is_ok(),
            error: ping.err().map(|e| e.to_string()),
        },
    };

    (code, Json(ApiResponse::success(health_response)))
}
