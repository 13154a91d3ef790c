use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    auth::{AuthUser, TokenState},
    backend::BackendState,
    config::AppConfig,
    credentials::CredentialState,
    error::ApiError,
    extract::ValidJson,
    models::{Credentials, CreatePostRequest, NewPost, Post, PostIdRequest, PostIdResponse, PostList},
    pagination::{PaginationRequest, normalize},
    password::{hash_password, verify_password},
};

// --- Accounts ---

/// register
///
/// [Public Route] Creates an account. The password is stored only as an
/// Argon2 hash with a per-account salt.
#[utoipa::path(
    post,
    path = "/register",
    request_body = Credentials,
    responses(
        (status = 200, description = "Account created"),
        (status = 400, description = "Malformed or oversized payload"),
        (status = 409, description = "Login already taken")
    )
)]
pub async fn register(
    State(accounts): State<CredentialState>,
    ValidJson(credentials): ValidJson<Credentials>,
) -> Result<StatusCode, ApiError> {
    let password_hash = hash_password(&credentials.password)?;
    accounts.save(&credentials.login, &password_hash).await?;

    tracing::info!(login = %credentials.login, "account registered");
    Ok(StatusCode::OK)
}

/// authenticate
///
/// [Public Route] Exchanges credentials for a session token delivered in the
/// `jwt` cookie. Unknown login and wrong password get the same 404.
#[utoipa::path(
    post,
    path = "/auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Authenticated, token set in the jwt cookie"),
        (status = 404, description = "Incorrect login or password")
    )
)]
pub async fn authenticate(
    State(accounts): State<CredentialState>,
    State(tokens): State<TokenState>,
    State(config): State<AppConfig>,
    ValidJson(credentials): ValidJson<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let stored_hash = accounts
        .lookup(&credentials.login)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&credentials.password, &stored_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = tokens.issue(&credentials.login)?;
    let cookie = config.session_cookie().build_set_cookie(&token);

    tracing::info!(login = %credentials.login, "token issued");
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

// --- Posts ---

/// create_post
///
/// [Authenticated Route] Stores a post authored by the caller and returns its id.
#[utoipa::path(
    post,
    path = "/create",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = PostIdResponse),
        (status = 400, description = "Oversized field or unsupported image format"),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn create_post(
    AuthUser { login }: AuthUser,
    State(posts): State<BackendState>,
    ValidJson(request): ValidJson<CreatePostRequest>,
) -> Result<Json<PostIdResponse>, ApiError> {
    let id = posts
        .create_post(NewPost {
            author: login,
            headline: request.headline,
            content: request.content,
            location: request.location,
            value: request.value,
            created_at: Utc::now(),
        })
        .await?;

    Ok(Json(PostIdResponse { id }))
}

/// get_post
///
/// [Authenticated Route] Fetches one post by id.
#[utoipa::path(
    post,
    path = "/getPost",
    request_body = PostIdRequest,
    responses(
        (status = 200, description = "The post", body = Post),
        (status = 404, description = "No post with that id")
    )
)]
pub async fn get_post(
    _user: AuthUser,
    State(posts): State<BackendState>,
    ValidJson(PostIdRequest { id }): ValidJson<PostIdRequest>,
) -> Result<Json<Post>, ApiError> {
    posts.get_post(id).await?.map(Json).ok_or(ApiError::NotFound)
}

/// list_posts
///
/// [Authenticated Route] One page of posts, either sorted by date or value or
/// filtered by a closed value range.
#[utoipa::path(
    post,
    path = "/list",
    request_body = PaginationRequest,
    responses(
        (status = 200, description = "A page of posts", body = PostList),
        (status = 400, description = "Invalid sort column, order or page")
    )
)]
pub async fn list_posts(
    _user: AuthUser,
    State(posts): State<BackendState>,
    ValidJson(request): ValidJson<PaginationRequest>,
) -> Result<Json<PostList>, ApiError> {
    let query = normalize(&request)?;
    let posts = posts.list_posts(query).await?;
    Ok(Json(PostList { posts }))
}

/// Answers every non-POST request to an API endpoint.
pub async fn method_not_allowed() -> ApiError {
    ApiError::Validation("Method not allowed".to_string())
}
