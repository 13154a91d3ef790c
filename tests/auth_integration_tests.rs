mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{
    OTHER_PRIVATE_PEM, PUBLIC_PEM, new_post_body, post_json, register_and_login, send,
    test_router, test_tokens,
};
use postboard::{TokenIssuer, auth::TOKEN_TTL_SECS};
use serde_json::json;

// --- Registration ---

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let router = test_router();
    let credentials = json!({ "login": "alice", "password": "pw" });

    let first = send(&router, post_json("/register", credentials.clone(), None)).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = send(&router, post_json("/register", credentials, None)).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_length_limits_on_credentials() {
    let router = test_router();

    let at_limit = json!({ "login": "a".repeat(50), "password": "p".repeat(120) });
    let ok = send(&router, post_json("/register", at_limit, None)).await;
    assert_eq!(ok.status, StatusCode::OK);

    let long_login = json!({ "login": "a".repeat(51), "password": "pw" });
    let rejected = send(&router, post_json("/register", long_login, None)).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    let long_password = json!({ "login": "bob", "password": "p".repeat(121) });
    let rejected = send(&router, post_json("/register", long_password, None)).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    // Limits count characters, not bytes.
    let multibyte = json!({ "login": "é".repeat(50), "password": "pw" });
    let ok = send(&router, post_json("/register", multibyte, None)).await;
    assert_eq!(ok.status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_register_body_is_bad_request() {
    let router = test_router();
    let response = send(&router, post_json("/register", json!({ "login": "alice" }), None)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// --- Authentication ---

#[tokio::test]
async fn test_issued_token_names_the_login() {
    let router = test_router();
    let cookie = register_and_login(&router, "alice", "wonderland").await;
    let token = cookie.trim_start_matches("jwt=");

    assert_eq!(test_tokens().validate(token).unwrap(), "alice");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_login_look_the_same() {
    let router = test_router();
    register_and_login(&router, "alice", "right").await;

    let wrong_password = send(
        &router,
        post_json("/auth", json!({ "login": "alice", "password": "wrong" }), None),
    )
    .await;
    let unknown_login = send(
        &router,
        post_json("/auth", json!({ "login": "nobody", "password": "right" }), None),
    )
    .await;

    assert_eq!(wrong_password.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_login.status, StatusCode::NOT_FOUND);
    assert_eq!(wrong_password.body, unknown_login.body);
    assert!(wrong_password.headers.get("set-cookie").is_none());
}

// --- Token validation at the gateway ---

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let router = test_router();
    register_and_login(&router, "alice", "pw").await;

    let minted = Utc::now().timestamp() - TOKEN_TTL_SECS;
    let token = test_tokens().issue_at("alice", minted).unwrap();
    let response = send(
        &router,
        post_json("/create", new_post_body("h", "a.png", 1), Some(&format!("jwt={token}"))),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_another_key_is_rejected() {
    let router = test_router();
    register_and_login(&router, "alice", "pw").await;

    let forger = TokenIssuer::from_rsa_pem(OTHER_PRIVATE_PEM, PUBLIC_PEM).unwrap();
    let token = forger.issue("alice").unwrap();
    let response = send(
        &router,
        post_json("/getPost", json!({ "id": 1 }), Some(&format!("jwt={token}"))),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_fresh_token_is_accepted_alongside_other_cookies() {
    let router = test_router();
    register_and_login(&router, "alice", "pw").await;

    let token = test_tokens().issue("alice").unwrap();
    let response = send(
        &router,
        post_json(
            "/create",
            new_post_body("h", "a.svg", 1),
            Some(&format!("theme=dark; jwt={token}; lang=en")),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}
