//! Router Module Index
//!
//! Routes are split by access level. Authentication is enforced per handler
//! by the `AuthUser` extractor, so the method check always runs first.

/// Registration, login and health. No token required.
pub mod public;

/// Post endpoints. Every handler takes an `AuthUser`.
pub mod authenticated;

use axum::{handler::Handler, routing::MethodRouter};

use crate::{AppState, handlers};

/// POST-only route; any other method is answered with 400.
pub(crate) fn post_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    axum::routing::post(handler).fallback(handlers::method_not_allowed)
}
