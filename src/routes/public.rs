use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// These routes cover read-only catalog access and the identity gateway
/// (registration, login, token refresh).
///
/// A request that carries a bearer token is still authenticated here: a present but
/// invalid token is rejected with 401 rather than silently treated as anonymous.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /api/albums/?page=N
        // Lists all albums, paginated two per page.
        .route("/api/albums/", get(handlers::list_albums))
        // GET /api/albums/{id}/songs/?page=N
        // Lists the songs of one album, paginated two per page.
        .route("/api/albums/{id}/songs/", get(handlers::list_songs))
        // POST /api/users/
        // Account registration.
        .route("/api/users/", post(handlers::register_user))
        // GET /api/users/{id}/
        // Public account detail. Writes on the same path live in the owner router.
        .route("/api/users/{id}/", get(handlers::get_user))
        // POST /api/users/login/
        // Exchanges credentials for an access/refresh token pair.
        .route("/api/users/login/", post(handlers::login))
        // POST /api/users/login/refresh/
        // Exchanges a refresh token for a new access token.
        .route("/api/users/login/refresh/", post(handlers::refresh_token))
}
