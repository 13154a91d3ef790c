use std::{env, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{
    auth::{JWT_COOKIE, TOKEN_TTL_SECS},
    cookie::SessionCookie,
    db::RetryPolicy,
};

pub const DEFAULT_GATEWAY_ADDR: &str = "0.0.0.0:3333";
pub const DEFAULT_POST_SERVICE_ADDR: &str = "0.0.0.0:50051";
pub const DEFAULT_POST_SERVICE_URL: &str = "http://127.0.0.1:50051";
const DEFAULT_PRIVATE_KEY_PATH: &str = "keys/jwt_private.pem";
const DEFAULT_PUBLIC_KEY_PATH: &str = "keys/jwt_public.pem";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Env
///
/// Runtime context. Production switches logs to JSON, marks the session
/// cookie `Secure` and makes key paths and the post service URL mandatory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Where the post service and the credential store keep their data.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StorageBackend {
    Postgres { url: String },
    Memory,
}

/// AppConfig
///
/// Immutable configuration shared by both binaries, read once at startup and
/// pulled into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub env: Env,
    pub storage: StorageBackend,
    pub jwt_private_key_path: PathBuf,
    pub jwt_public_key_path: PathBuf,
    /// Base URL the gateway uses to reach the post service.
    pub post_service_url: String,
    pub gateway_addr: String,
    pub post_service_addr: String,
    pub rpc_deadline: Duration,
    pub storage_deadline: Duration,
    pub db_retry: RetryPolicy,
    /// Continue post ids after the largest stored one instead of restarting at 1.
    pub seed_ids_from_store: bool,
}

impl Default for AppConfig {
    /// Local settings with in-memory storage and the test key pair.
    fn default() -> Self {
        Self {
            env: Env::Local,
            storage: StorageBackend::Memory,
            jwt_private_key_path: PathBuf::from("tests/fixtures/jwt_private.pem"),
            jwt_public_key_path: PathBuf::from("tests/fixtures/jwt_public.pem"),
            post_service_url: DEFAULT_POST_SERVICE_URL.to_string(),
            gateway_addr: DEFAULT_GATEWAY_ADDR.to_string(),
            post_service_addr: DEFAULT_POST_SERVICE_ADDR.to_string(),
            rpc_deadline: Duration::from_millis(2000),
            storage_deadline: Duration::from_millis(3000),
            db_retry: RetryPolicy {
                attempts: 10,
                backoff: Duration::from_millis(2000),
            },
            seed_ids_from_store: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the process environment. Call `dotenv` first if a `.env` file
    /// should be honored.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Same as `load`, reading variables through `lookup`.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let env = match var("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let storage = match var("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres {
                url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                    reason: "expected \"postgres\" or \"memory\"".to_string(),
                });
            }
        };

        // Production never falls back to development keys or a loopback service URL.
        let required = |key: &'static str, local_default: &str| match (var(key), env) {
            (Some(value), _) => Ok(value),
            (None, Env::Local) => Ok(local_default.to_string()),
            (None, Env::Production) => Err(ConfigError::Missing(key)),
        };

        Ok(Self {
            env,
            storage,
            jwt_private_key_path: required("JWT_PRIVATE_KEY_PATH", DEFAULT_PRIVATE_KEY_PATH)?.into(),
            jwt_public_key_path: required("JWT_PUBLIC_KEY_PATH", DEFAULT_PUBLIC_KEY_PATH)?.into(),
            post_service_url: required("POST_SERVICE_URL", DEFAULT_POST_SERVICE_URL)?,
            gateway_addr: var("GATEWAY_ADDR").unwrap_or(defaults.gateway_addr),
            post_service_addr: var("POST_SERVICE_ADDR").unwrap_or(defaults.post_service_addr),
            rpc_deadline: millis(&var, "RPC_DEADLINE_MS", defaults.rpc_deadline)?,
            storage_deadline: millis(&var, "STORAGE_DEADLINE_MS", defaults.storage_deadline)?,
            db_retry: RetryPolicy {
                attempts: parsed(&var, "DB_CONNECT_ATTEMPTS", defaults.db_retry.attempts)?,
                backoff: millis(&var, "DB_CONNECT_BACKOFF_MS", defaults.db_retry.backoff)?,
            },
            seed_ids_from_store: parsed(&var, "POST_ID_SEED_FROM_STORE", false)?,
        })
    }

    /// Attributes of the `jwt` cookie set by `/auth`.
    pub fn session_cookie(&self) -> SessionCookie {
        SessionCookie {
            name: JWT_COOKIE.to_string(),
            secure: self.env == Env::Production,
            max_age_secs: TOKEN_TTL_SECS,
        }
    }
}

fn parsed<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: err.to_string(),
        }),
    }
}

fn millis(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let ms = parsed(var, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}
