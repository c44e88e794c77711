use music_catalog::{
    AppConfig, AppState, create_router,
    repository::{RepositoryState, SqliteRepository},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

/// Serves the full router on an ephemeral port, backed by a fresh in-memory database.
async fn spawn_app() -> TestApp {
    let repo = SqliteRepository::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database in tests");

    let state = AppState {
        repo: Arc::new(repo) as RepositoryState,
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_lists_catalog_paths() {
    let app = spawn_app().await;

    let doc: Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/api/albums/",
        "/api/albums/{id}/songs/",
        "/api/users/",
        "/api/users/{id}/",
        "/api/users/login/",
        "/api/users/login/refresh/",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}

#[tokio::test]
async fn test_register_login_and_create_album_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = client
        .post(format!("{}/api/users/", app.address))
        .json(&json!({
            "username": "ana",
            "email": "ana@example.com",
            "artistic_name": "Ana",
            "password": "pass-word-1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(registered.status().as_u16(), 201);

    let tokens: Value = client
        .post(format!("{}/api/users/login/", app.address))
        .json(&json!({ "username": "ana", "password": "pass-word-1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let access = tokens["access"].as_str().unwrap();

    let created = client
        .post(format!("{}/api/albums/", app.address))
        .bearer_auth(access)
        .json(&json!({ "name": "Live", "year": 2024 }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);

    let listed: Value = client
        .get(format!("{}/api/albums/", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["results"][0]["user"]["username"], "ana");
    assert_eq!(listed["next"], Value::Null);
}
