use crate::{AppState, handlers};
use axum::Router;

use super::post_only;

/// Authenticated Router Module
///
/// Post endpoints. Each handler resolves the caller through `AuthUser`, which
/// rejects a missing, forged or expired token with 401 before any backend
/// call is made.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /create
        // Stores a post authored by the caller; returns {"id": n}.
        .route("/create", post_only(handlers::create_post))
        // POST /getPost
        // Fetches a single post by id.
        .route("/getPost", post_only(handlers::get_post))
        // POST /list
        // Paginated listing sorted by date/value or filtered by a value range.
        .route("/list", post_only(handlers::list_posts))
}
