use std::{path::Path, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{cookie, error::ApiError};

/// Lifetime of a freshly minted token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 1800;

/// Name of the cookie carrying the bearer token.
pub const JWT_COOKIE: &str = "jwt";

/// Claims
///
/// The payload signed into every bearer token. `iss` is the login of the
/// account the token was minted for; `exp` is a unix timestamp in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No token presented")]
    MissingToken,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token is malformed")]
    Malformed,
    #[error("Token has expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("cannot read key file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid RSA key: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// TokenIssuer
///
/// Mints and verifies RS256 bearer tokens. Minting needs the private key,
/// verification only the public one. There is no server-side session state:
/// a token is valid until its `exp`, whatever happens to the account.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// TokenState
///
/// Shared handle to the issuer, pulled out of the application state by `AuthUser`.
pub type TokenState = Arc<TokenIssuer>;

impl TokenIssuer {
    pub fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, KeyError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)?;

        // Expiry is checked by hand in `validate_at` so that there is no leeway
        // and a missing `exp` surfaces as a malformed token.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding,
            decoding,
            validation,
        })
    }

    pub fn from_pem_files(private_path: &Path, public_path: &Path) -> Result<Self, KeyError> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|source| KeyError::Io {
                path: path.display().to_string(),
                source,
            })
        };
        Self::from_rsa_pem(&read(private_path)?, &read(public_path)?)
    }

    pub fn issue(&self, login: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(login, Utc::now().timestamp())
    }

    /// Mints a token as if the current time were `now` (unix seconds).
    pub fn issue_at(&self, login: &str, now: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            iss: login.to_string(),
            exp: now + TOKEN_TTL_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding)
    }

    pub fn validate(&self, token: &str) -> Result<String, AuthError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Verifies `token` against the public key and returns its issuer.
    /// A token is expired once `exp <= now`.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<String, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::Malformed,
            }
        })?;

        if data.claims.exp <= now {
            return Err(AuthError::Expired);
        }

        Ok(data.claims.iss)
    }
}

/// AuthUser
///
/// The identity resolved from a valid bearer token. Taking `AuthUser` as a
/// handler argument makes the route require authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub login: String,
}

/// Reads the token from the `jwt` cookie first, then from an
/// `Authorization: Bearer` header. Rejects with `ApiError::Auth`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenState::from_ref(state);

        let token = cookie::extract_cookie(&parts.headers, JWT_COOKIE)
            .or_else(|| bearer_token(&parts.headers))
            .ok_or(AuthError::MissingToken)?;

        let login = tokens.validate(&token)?;

        Ok(AuthUser { login })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}
