use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Auth Router Module
///
/// Mounted under `/auth`. Token issuance is the only anonymous endpoint;
/// registration and the user listing require an admin bearer token, enforced
/// by the `AdminUser` extractor on the handlers themselves.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/token
        // Form-encoded credential exchange. Returns a bearer token on success.
        .route("/token", post(handlers::login))
        // POST /auth/register
        // Admin-only creation of a new credential.
        .route("/register", post(handlers::register))
        // GET /auth/users
        // Admin-only listing of all credentials, passwords omitted.
        .route("/users", get(handlers::list_users))
}
