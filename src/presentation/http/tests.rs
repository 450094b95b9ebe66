use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value as Json, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::domain::entities::{CreateDirectory, CreateFile, CreateUser, User};
use crate::domain::stores::{Store, TransactionOptions};
use crate::infrastructure::AppContainer;
use crate::infrastructure::memory::MemoryBackend;

fn container() -> AppContainer {
    let config = AppConfig::from_lookup(|name| match name {
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .unwrap();
    let store = Store::new(Arc::new(MemoryBackend::new()), TransactionOptions::default());
    AppContainer::with_store(config, store)
}

async fn seed_user(container: &AppContainer) -> User {
    container
        .store
        .users()
        .create(CreateUser {
            email: "ada@example.com".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Json>) -> (StatusCode, Json) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn registration(user_id: &str) -> Json {
    json!({
        "name": "engine",
        "owner": "octo",
        "url": "https://github.com/octo/engine",
        "user_id": user_id,
        "avatar_url": "https://avatars.example.com/octo.png",
        "github_id": 7
    })
}

#[tokio::test]
async fn test_health_reports_store() {
    let container = container();
    let app = container.http_server().router();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["store"]["backend"], "memory");
    assert_eq!(body["data"]["store"]["reachable"], true);
}

#[tokio::test]
async fn test_repository_lifecycle() {
    let container = container();
    let app = container.http_server().router();
    let user = seed_user(&container).await;

    let (status, body) = send(&app, Method::POST, "/repositories", Some(registration(&user.id))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "PENDING");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/repositories/{}/status", id),
        Some(json!({ "status": "PROCESSING" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/repositories/{}/status", id),
        Some(json!({ "status": "SUCCESS", "overview": "A small engine" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "SUCCESS");
    assert_eq!(body["data"]["overview"], "A small engine");

    let (status, body) = send(&app, Method::GET, &format!("/repositories/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fileCount"], 0);
    assert_eq!(body["data"]["name"], "engine");

    let (status, body) = send(&app, Method::GET, &format!("/repositories/{}/logs", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["logs"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/repositories?user_id={}&status=SUCCESS", user.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 1);

    let (status, body) = send(&app, Method::GET, "/repositories?status=PENDING", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 0);

    let (status, body) = send(&app, Method::DELETE, &format!("/repositories/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = send(&app, Method::GET, &format!("/repositories/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "REPOSITORY_NOT_FOUND");
    assert_eq!(container.store.logs().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_requests() {
    let container = container();
    let app = container.http_server().router();
    let user = seed_user(&container).await;

    let (status, body) = send(&app, Method::POST, "/repositories", Some(registration("nobody"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");

    let (status, body) = send(&app, Method::GET, "/repositories?status=DONE", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, Method::GET, "/repositories?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::POST, "/repositories", Some(registration(&user.id))).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/repositories/{}/status", id),
        Some(json!({ "status": "SUCCESS" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATUS_TRANSITION");

    let (status, _) = send(
        &app,
        Method::POST,
        "/repositories/missing/status",
        Some(json!({ "status": "PROCESSING" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tree_and_files() {
    let container = container();
    let app = container.http_server().router();
    let user = seed_user(&container).await;
    let (_, body) = send(&app, Method::POST, "/repositories", Some(registration(&user.id))).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let src = container
        .ingestion_service
        .record_directory(CreateDirectory {
            path: "src".to_string(),
            repository_id: id.clone(),
            ..Default::default()
        })
        .await
        .unwrap();
    let lib = container
        .ingestion_service
        .record_file(CreateFile {
            path: "src/lib.rs".to_string(),
            name: "lib.rs".to_string(),
            repository_id: id.clone(),
            directory_id: Some(src.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    container
        .ingestion_service
        .record_file(CreateFile {
            path: "README.md".to_string(),
            name: "README.md".to_string(),
            repository_id: id.clone(),
            ..Default::default()
        })
        .await
        .unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/repositories/{}/tree", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["directories"][0]["path"], "src");
    assert_eq!(body["data"]["directories"][0]["files"][0]["name"], "lib.rs");
    assert_eq!(body["data"]["files"][0]["name"], "README.md");

    let (status, body) = send(&app, Method::GET, &format!("/repositories/{}/files", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 2);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/repositories/{}/files?directory_id={}", id, src.id),
        None,
    )
    .await;
    assert_eq!(body["data"]["meta"]["total"], 1);

    let (status, body) = send(&app, Method::GET, &format!("/files/{}", lib.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["path"], "src/lib.rs");

    let (status, body) = send(&app, Method::GET, "/files/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");

    let (status, _) = send(&app, Method::GET, "/repositories/missing/tree", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
