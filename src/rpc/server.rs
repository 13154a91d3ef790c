use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use super::{CREATE_PATH, GET_PATH, LIST_PATH, RpcFailure};
use crate::{
    backend::{BackendError, BackendState},
    models::{NewPost, Post, PostIdRequest, PostIdResponse, PostList},
    pagination::ListQuery,
};

/// RpcError
///
/// Server-side wrapper that turns a `BackendError` into a status plus an
/// `RpcFailure` body. A storage deadline becomes 504, everything else 500.
pub struct RpcError(BackendError);

impl From<BackendError> for RpcError {
    fn from(err: BackendError) -> Self {
        RpcError(err)
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            BackendError::DeadlineExceeded(_) => (StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded"),
            BackendError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            BackendError::Unavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unavailable"),
            BackendError::Protocol(_) => (StatusCode::INTERNAL_SERVER_ERROR, "protocol"),
        };
        tracing::error!(error = %self.0, "post service call failed");

        let body = RpcFailure {
            kind: kind.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// rpc_router
///
/// Exposes a `PostBackend` (normally the `PostService`) to remote callers.
pub fn rpc_router(backend: BackendState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(CREATE_PATH, post(create))
        .route(GET_PATH, post(fetch))
        .route(LIST_PATH, post(list))
        .with_state(backend)
}

async fn create(
    State(backend): State<BackendState>,
    Json(post): Json<NewPost>,
) -> Result<Json<PostIdResponse>, RpcError> {
    let id = backend.create_post(post).await?;
    Ok(Json(PostIdResponse { id }))
}

async fn fetch(
    State(backend): State<BackendState>,
    Json(PostIdRequest { id }): Json<PostIdRequest>,
) -> Result<Response, RpcError> {
    Ok(match backend.get_post(id).await? {
        Some(post) => Json::<Post>(post).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

async fn list(
    State(backend): State<BackendState>,
    Json(query): Json<ListQuery>,
) -> Result<Json<PostList>, RpcError> {
    let posts = backend.list_posts(query).await?;
    Ok(Json(PostList { posts }))
}
