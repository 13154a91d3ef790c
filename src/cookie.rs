//! Cookie helpers for delivering and reading the bearer token.

use axum::http::{HeaderMap, header};

/// SessionCookie
///
/// Attributes of the `Set-Cookie` header sent on successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
    pub max_age_secs: i64,
}

impl SessionCookie {
    pub fn build_set_cookie(&self, value: &str) -> String {
        let mut cookie = format!("{}={}; HttpOnly", self.name, value);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=Strict; Path=/");
        cookie.push_str(&format!("; Max-Age={}", self.max_age_secs));
        cookie
    }
}

/// Extract a cookie value from request headers. Every `Cookie` header is searched.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}
