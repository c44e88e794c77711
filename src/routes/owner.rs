use crate::{AppState, handlers};
use axum::{Router, routing::patch};

/// Owner Router Module
///
/// Account mutation routes. They are not behind the authentication layer: the target account
/// is looked up first so that an unknown id is a 404 for everyone, and only then does the
/// handler require the requester to be that account (401 when anonymous, 403 otherwise).
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        // PATCH /api/users/{id}/  partial update
        // PUT   /api/users/{id}/  full update
        // DELETE /api/users/{id}/ removes the account with its albums and songs
        .route(
            "/api/users/{id}/",
            patch(handlers::update_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
