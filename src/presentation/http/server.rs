use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::domain::stores::Store;
use crate::presentation::http::{
    handlers::{FileHandler, RepositoryHandler},
    routes::{file_routes, health_routes, repository_routes},
};

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub struct HttpServer {
    repository_handler: Arc<RepositoryHandler>,
    file_handler: Arc<FileHandler>,
    store: Store,
    port: u16,
}

impl HttpServer {
    pub fn new(
        repository_handler: Arc<RepositoryHandler>,
        file_handler: Arc<FileHandler>,
        store: Store,
        port: Option<u16>,
    ) -> Self {
        Self {
            repository_handler,
            file_handler,
            store,
            port: port.unwrap_or(3000),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(health_routes(self.store.clone()))
            .merge(repository_routes(self.repository_handler.clone()))
            .merge(file_routes(self.file_handler.clone()))
            .layer(cors)
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "http",
                            method = %request.method(),
                            uri = %request.uri()
                        )
                    })
                    .on_request(|_request: &Request<Body>, _span: &Span| {
                        tracing::debug!("started");
                    })
                    .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                        tracing::info!(
                            status = response.status().as_u16(),
                            latency_ms = latency.as_millis() as u64,
                            "finished"
                        );
                    })
                    .on_failure(
                        |error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                            tracing::error!(
                                latency_ms = latency.as_millis() as u64,
                                "request failed: {}",
                                error
                            );
                        },
                    ),
            )
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {} ({} store)", addr, self.store.backend_name());
        axum::serve(listener, app).await?;

        Ok(())
    }
}
