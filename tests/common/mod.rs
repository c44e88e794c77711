#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use music_catalog::{
    AppConfig, AppState, create_router,
    models::TokenPair,
    repository::{RepositoryState, SqliteRepository},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "s3cret-pass!";

/// A router over a fresh in-memory database, plus direct access to the repository.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<SqliteRepository>,
}

pub async fn spawn_app() -> TestApp {
    let repo = Arc::new(
        SqliteRepository::connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database"),
    );
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: AppConfig::default(),
    };
    TestApp {
        router: create_router(state),
        repo,
    }
}

/// Parsed response: status, headers and the body as JSON (`Value::Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "testserver");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Registers `username` with a derived email and the shared test password.
    pub async fn register(&self, username: &str) -> Value {
        let response = self
            .post(
                "/api/users/",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "full_name": "Test Person",
                    "artistic_name": format!("{username} band"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    pub async fn login(&self, username: &str) -> TokenPair {
        let response = self
            .post(
                "/api/users/login/",
                None,
                json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        serde_json::from_value(response.body).unwrap()
    }

    /// Registers and logs in, returning the user's id and access token.
    pub async fn signed_up(&self, username: &str) -> (i64, String) {
        let user = self.register(username).await;
        let tokens = self.login(username).await;
        (user["id"].as_i64().unwrap(), tokens.access)
    }

    pub async fn create_album(&self, token: &str, name: &str, year: i64) -> Value {
        let response = self
            .post(
                "/api/albums/",
                Some(token),
                json!({ "name": name, "year": year }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }
}
