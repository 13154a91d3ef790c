use axum::{Router, extract::FromRef};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// --- Module Structure ---

// Gateway: authentication, validation and dispatch.
pub mod auth;
pub mod cookie;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod password;
pub mod routes;

// Storage tier: id allocation, query execution and the post service.
pub mod backend;
pub mod credentials;
pub mod ids;
pub mod repository;
pub mod rpc;

// Shared by both binaries.
pub mod config;
pub mod db;
pub mod models;
pub mod pagination;
pub mod shutdown;
pub mod telemetry;

use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{TokenIssuer, TokenState};
pub use backend::{BackendState, PostBackend, PostService};
pub use config::AppConfig;
pub use credentials::{CredentialState, InMemoryCredentialStore, PostgresCredentialStore};
pub use error::ApiError;
pub use repository::{InMemoryPostRepository, PostgresPostRepository, RepositoryState};
pub use rpc::RemotePostBackend;

/// ApiDoc
///
/// OpenAPI document for the gateway, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::authenticate, handlers::create_post,
        handlers::get_post, handlers::list_posts
    ),
    components(
        schemas(
            models::Credentials, models::CreatePostRequest, models::PostIdRequest,
            models::PostIdResponse, models::Post, models::PostList,
            pagination::PaginationRequest,
        )
    ),
    tags(
        (name = "postboard", description = "Postboard gateway API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Everything a gateway handler can reach. Cloned per request; every field
/// is an `Arc` or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub accounts: CredentialState,
    /// The storage tier, remote in production.
    pub posts: BackendState,
    pub tokens: TokenState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for CredentialState {
    fn from_ref(app_state: &AppState) -> CredentialState {
        app_state.accounts.clone()
    }
}

impl FromRef<AppState> for BackendState {
    fn from_ref(app_state: &AppState) -> BackendState {
        app_state.posts.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the gateway: Swagger UI, public and authenticated routes, then
/// the observability stack and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .with_state(state);

    telemetry::with_observability(base_router).layer(cors)
}
