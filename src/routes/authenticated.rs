use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Authenticated Router Module
///
/// Defines the catalog write routes. Any authenticated user may create albums and add songs;
/// the owner of a new album is always the requester.
///
/// Access Control Strategy:
/// This router is wrapped in the `auth_middleware` route layer by `create_router`, and each
/// handler additionally takes the `AuthUser` extractor, so a request without a valid access
/// token never reaches validation.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/albums/
        // Creates an album owned by the requester.
        .route("/api/albums/", post(handlers::create_album))
        // POST /api/albums/{id}/songs/
        // Adds a song to an existing album. 404 when the album does not exist.
        .route("/api/albums/{id}/songs/", post(handlers::create_song))
}
