use crate::{AppState, handlers};
use axum::{Router, routing::get};

use super::post_only;

/// Public Router Module
///
/// Endpoints reachable without a session token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and the container runtime.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates an account from {login, password}.
        .route("/register", post_only(handlers::register))
        // POST /auth
        // Verifies credentials and sets the `jwt` cookie.
        .route("/auth", post_only(handlers::authenticate))
}
