#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use postboard::{
    AppConfig, AppState, BackendState, InMemoryCredentialStore, InMemoryPostRepository,
    PostService, TokenIssuer, TokenState, create_router, rpc::rpc_router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/jwt_private.pem");
pub const PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/jwt_public.pem");
pub const OTHER_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/other_private.pem");

pub fn test_tokens() -> TokenState {
    Arc::new(TokenIssuer::from_rsa_pem(PRIVATE_PEM, PUBLIC_PEM).unwrap())
}

pub fn in_memory_backend() -> BackendState {
    Arc::new(PostService::new(
        Arc::new(InMemoryPostRepository::new()),
        Duration::from_secs(1),
    ))
}

/// Gateway state with in-memory accounts and an in-process post service.
pub fn test_state() -> AppState {
    state_with_backend(in_memory_backend())
}

pub fn state_with_backend(posts: BackendState) -> AppState {
    AppState {
        accounts: Arc::new(InMemoryCredentialStore::new()),
        posts,
        tokens: test_tokens(),
        config: AppConfig::default(),
    }
}

pub fn test_router() -> Router {
    create_router(test_state())
}

/// Serves `backend` over the RPC routes on an ephemeral port and returns the base URL.
pub async fn spawn_post_service(backend: BackendState) -> String {
    spawn(rpc_router(backend)).await
}

pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{port}")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `name=value` pair of the `Set-Cookie` header, ready to send back.
    pub fn session_cookie(&self) -> String {
        let set_cookie = self
            .headers
            .get(header::SET_COOKIE)
            .expect("no Set-Cookie header")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

pub fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Registers `login` and returns the session cookie from `/auth`.
pub async fn register_and_login(router: &Router, login: &str, password: &str) -> String {
    let credentials = serde_json::json!({ "login": login, "password": password });

    let registered = send(router, post_json("/register", credentials.clone(), None)).await;
    assert_eq!(registered.status, StatusCode::OK);

    let authed = send(router, post_json("/auth", credentials, None)).await;
    assert_eq!(authed.status, StatusCode::OK);
    authed.session_cookie()
}

pub fn new_post_body(headline: &str, location: &str, value: i64) -> Value {
    serde_json::json!({
        "headline": headline,
        "content": "some content",
        "location": location,
        "value": value,
    })
}
