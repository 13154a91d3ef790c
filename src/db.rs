use std::{fmt::Display, future::Future, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

/// RetryPolicy
///
/// Fixed-backoff retry used only for the startup connection to Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

/// Runs `op` until it succeeds or `policy.attempts` tries have failed,
/// sleeping `policy.backoff` in between. Returns the last error.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    attempts,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    error = %err,
                    "connection attempt failed, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub async fn connect_with_retry(url: &str, policy: RetryPolicy) -> Result<PgPool, sqlx::Error> {
    retry_with_backoff(policy, || PgPoolOptions::new().max_connections(5).connect(url)).await
}
